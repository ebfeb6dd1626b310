//! Check-in request/response DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, PaymentMode};
use crate::wallet::ReleaseOutcome;

/// Phase 1 request body
#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub staff_user_id: Uuid,
}

/// Booking details returned to staff by phase 1
#[derive(Debug, Serialize)]
pub struct CheckInLookup {
    pub booking_id: Uuid,
    pub kind: &'static str,
    pub guest_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub payment_mode: PaymentMode,
    /// Whether this call generated (and dispatched) a fresh code
    pub code_generated: bool,
}

impl CheckInLookup {
    pub fn from_booking(booking: &Booking, code_generated: bool) -> Self {
        Self {
            booking_id: booking.id,
            kind: booking.kind.label(),
            guest_name: booking.guest_name.clone(),
            amount: booking.amount,
            currency: booking.currency.clone(),
            payment_mode: booking.payment_mode,
            code_generated,
        }
    }
}

/// Phase 2 request body
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub staff_user_id: Uuid,
    pub code: String,
    /// Optional arrival instructions relayed to the guest
    pub instructions: Option<String>,
}

/// Phase 2 result
#[derive(Debug, Serialize)]
pub struct CheckInConfirmation {
    pub booking_id: Uuid,
    pub checked_in_at: DateTime<Utc>,
    pub released: Vec<ReleaseOutcome>,
}

/// Check-out request body
#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub staff_user_id: Uuid,
}

/// Check-out result
#[derive(Debug, Serialize)]
pub struct CheckOutConfirmation {
    pub booking_id: Uuid,
    pub checked_out_at: DateTime<Utc>,
}
