//! Payment service layer - webhook processing and payment readiness

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::booking::{Booking, BookingStore, PaymentMode};
use crate::error::{ApiError, ApiResult};
use crate::payments::{PaymentFlow, PaymentRecord, PaymentStatus, PaymentWebhookPayload};
use crate::wallet::WalletService;

/// Payment service: records provider events and funds wallets on completion
#[derive(Clone)]
pub struct PaymentService {
    db_pool: PgPool,
    wallets: WalletService,
    bookings: BookingStore,
}

impl PaymentService {
    pub fn new(db_pool: PgPool, wallets: WalletService, bookings: BookingStore) -> Self {
        Self {
            db_pool,
            wallets,
            bookings,
        }
    }

    /// Whether a booking's payment obligations are satisfied for check-in
    ///
    /// Online bookings need a completed booking payment; pay-on-arrival
    /// bookings need a completed collection record.
    pub async fn payment_ready(&self, booking: &Booking) -> ApiResult<bool> {
        let required_flow = match booking.payment_mode {
            PaymentMode::Online => PaymentFlow::BookingPayment,
            PaymentMode::OnArrival => PaymentFlow::ArrivalCollection,
        };

        let ready = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payment_records
                WHERE booking_id = $1 AND flow = $2 AND status = 'completed'
            )
            "#,
        )
        .bind(booking.id)
        .bind(required_flow)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(ready)
    }

    /// Process an inbound payment-gateway event for a booking flow
    ///
    /// Returns the normalized status. The first transition to `completed`
    /// credits every beneficiary's wallet with a pending hold; replays and
    /// concurrent deliveries of the same reference credit nothing.
    pub async fn handle_payment_event(
        &self,
        flow: PaymentFlow,
        provider: &str,
        payload: &PaymentWebhookPayload,
    ) -> ApiResult<PaymentStatus> {
        let normalized = PaymentStatus::from_provider(&payload.status);

        let (record, transitioned) = self.upsert_record(flow, provider, payload, normalized).await?;

        tracing::info!(
            provider = %provider,
            reference = %payload.reference,
            status = ?normalized,
            transitioned,
            "Payment event recorded"
        );

        if transitioned && normalized == PaymentStatus::Completed {
            let booking_id = record.booking_id.ok_or_else(|| {
                ApiError::ValidationError(format!(
                    "Payment {} completed without a booking reference",
                    payload.reference
                ))
            })?;
            self.credit_booking_holds(booking_id).await?;
        }

        Ok(normalized)
    }

    /// Credit each beneficiary's wallet with their share, held pending
    async fn credit_booking_holds(&self, booking_id: Uuid) -> ApiResult<()> {
        let booking = self.bookings.find(booking_id).await?;
        let correlation = booking.id.to_string();

        for beneficiary in booking.beneficiaries() {
            if beneficiary.amount <= Decimal::ZERO {
                continue;
            }
            let entry = self
                .wallets
                .credit_pending(
                    beneficiary.user_id,
                    &booking.currency,
                    beneficiary.amount,
                    &format!("BKG-{}", booking.id),
                    "Booking funds held pending guest check-in",
                    Some(&correlation),
                )
                .await?;

            tracing::info!(
                booking_id = %booking.id,
                user_id = %beneficiary.user_id,
                amount = %entry.pending_amount,
                "Credited booking hold"
            );
        }

        Ok(())
    }

    /// Insert or advance the payment record for a provider reference
    ///
    /// Returns the record and whether this call moved it into a new
    /// non-replayed state. An already-completed record never transitions
    /// again.
    async fn upsert_record(
        &self,
        flow: PaymentFlow,
        provider: &str,
        payload: &PaymentWebhookPayload,
        normalized: PaymentStatus,
    ) -> ApiResult<(PaymentRecord, bool)> {
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payment_records (
                id, booking_id, flow, provider, provider_reference,
                status, amount, currency, correlation_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT (provider_reference) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload.booking_id)
        .bind(flow)
        .bind(provider)
        .bind(&payload.reference)
        .bind(normalized)
        .bind(payload.amount.unwrap_or(Decimal::ZERO))
        .bind(payload.currency.as_deref().unwrap_or("USD"))
        .bind(payload.booking_id.map(|id| id.to_string()))
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(record) = inserted {
            return Ok((record, true));
        }

        // Reference already known: advance the status unless it is final
        let updated = sqlx::query_as::<_, PaymentRecord>(
            r#"
            UPDATE payment_records
            SET status = $2, updated_at = $3
            WHERE provider_reference = $1
              AND status <> 'completed'
              AND status <> $2
            RETURNING *
            "#,
        )
        .bind(&payload.reference)
        .bind(normalized)
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(record) = updated {
            return Ok((record, true));
        }

        let existing = sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records WHERE provider_reference = $1",
        )
        .bind(&payload.reference)
        .fetch_one(&self.db_pool)
        .await?;

        Ok((existing, false))
    }
}
