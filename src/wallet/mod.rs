//! Wallet domain module
//!
//! Balance and pending-balance bookkeeping with an append-only ledger, plus
//! the release engine that moves booking holds from pending to available.

mod model;
mod release;
mod service;

pub use model::*;
pub use release::{ReleaseEngine, ReleaseOutcome};
pub use service::WalletService;

pub(crate) use service::retrying;
