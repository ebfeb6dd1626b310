//! Payment record models and provider status normalization

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Which money flow a payment record belongs to
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_flow", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentFlow {
    /// Guest paid online when booking
    BookingPayment,
    /// Staff collected payment from the guest on arrival
    ArrivalCollection,
}

/// Normalized payment status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Normalize a provider-specific status word
    ///
    /// Unknown vocabularies map to `Pending` with a warning instead of
    /// failing the webhook.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" | "COMPLETE" | "SUCCESS" | "SUCCESSFUL" | "PAID" => {
                PaymentStatus::Completed
            }
            "FAILED" | "FAILURE" | "INVALID" | "DECLINED" | "CANCELLED" | "CANCELED"
            | "EXPIRED" => PaymentStatus::Failed,
            "PENDING" | "PROCESSING" | "INITIATED" => PaymentStatus::Pending,
            other => {
                tracing::warn!(status = %other, "Unknown provider payment status, treating as pending");
                PaymentStatus::Pending
            }
        }
    }
}

/// A payment event tracked against a booking or withdrawal
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub flow: PaymentFlow,
    pub provider: String,
    pub provider_reference: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: String,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbound webhook payload, tolerant of provider differences
#[derive(Debug, Deserialize)]
pub struct PaymentWebhookPayload {
    /// Provider's transaction or order reference
    pub reference: String,
    /// Booking this event belongs to, when the provider echoes it back
    pub booking_id: Option<Uuid>,
    /// Raw provider status word; normalized before use
    pub status: String,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_vocabularies() {
        for raw in ["COMPLETED", "completed", "SUCCESS", "Successful", "PAID"] {
            assert_eq!(PaymentStatus::from_provider(raw), PaymentStatus::Completed);
        }
    }

    #[test]
    fn test_failed_vocabularies() {
        for raw in ["FAILED", "INVALID", "declined", "CANCELLED", "expired"] {
            assert_eq!(PaymentStatus::from_provider(raw), PaymentStatus::Failed);
        }
    }

    #[test]
    fn test_unknown_status_is_pending() {
        assert_eq!(
            PaymentStatus::from_provider("ON_HOLD_MAYBE"),
            PaymentStatus::Pending
        );
        assert_eq!(PaymentStatus::from_provider("  pending "), PaymentStatus::Pending);
    }
}
