//! Withdrawal domain module
//!
//! Request state machine, balance hold/refund logic, approval policy and the
//! expiry sweeper.

mod model;
mod policy;
mod service;
mod sweeper;

pub use model::*;
pub use policy::{ApprovalPolicy, AutoApprove, ManualApproval};
pub use service::WithdrawalService;
pub use sweeper::withdrawal_expiry_sweeper;
