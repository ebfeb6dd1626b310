//! Outbound notification domain
//!
//! SMS and email gateways behind narrow interfaces, plus the notification
//! service that renders and dispatches guest, staff and admin messages.
//! Dispatch is fire-and-forget relative to the state transitions that
//! trigger it: a delivery failure is logged, never propagated back into a
//! committed ledger or state-machine change.

mod email;
mod service;
mod sms;
pub mod templates;

pub use email::{EmailGateway, HttpEmailGateway};
pub use service::NotificationService;
pub use sms::{validate_e164, HttpSmsGateway, SmsDelivery, SmsGateway};
