//! OTP session state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Ephemeral per-user passcode session
///
/// Bound to the exact phone and amount it was issued for; a superseding
/// issuance replaces the session wholesale.
#[derive(Debug, Clone)]
pub struct OtpSession {
    pub code: String,
    pub phone: String,
    pub amount: Decimal,
    pub currency: String,
    pub attempts: u8,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of issuing a passcode
///
/// The raw code is handed back to the caller so a failed SMS delivery can be
/// retried over email with the same code; it must never be exposed to the
/// requesting client.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub sms_delivered: bool,
}
