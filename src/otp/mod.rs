//! One-time passcode domain
//!
//! Single-instance, in-memory session state keyed by user. Horizontal
//! scaling would need an externally shared, TTL-expiring store; the current
//! deployment runs one instance.

mod model;
mod service;

pub use model::{IssuedOtp, OtpSession};
pub use service::{session_purger, OtpAuthority};
