//! Booking persistence: lookups, code assignment, check-in flag flips

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::booking::{Booking, BookingRow};
use crate::error::{ApiError, ApiResult};

/// Outcome of attempting to attach a freshly generated code to a booking
#[derive(Debug, PartialEq, Eq)]
pub enum CodeAssignment {
    /// The code was stored on this booking
    Assigned,
    /// Another booking already owns this code; caller should generate again
    CodeTaken,
    /// The booking already carries a code (e.g. a concurrent lookup won)
    AlreadyHasCode,
}

/// Store for bookings across both domains
#[derive(Clone)]
pub struct BookingStore {
    db_pool: PgPool,
}

impl BookingStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch a booking by id
    pub async fn find(&self, booking_id: Uuid) -> ApiResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db_pool)
            .await?;

        match row {
            Some(row) => Booking::try_from(row),
            None => Err(ApiError::NotFound(format!(
                "Booking {} not found",
                booking_id
            ))),
        }
    }

    /// Attach a verification code to a booking that has none yet
    ///
    /// The UNIQUE index on `booking_code` spans both booking domains, which
    /// is what makes codes globally unique; a collision surfaces as
    /// [`CodeAssignment::CodeTaken`] for the caller's retry loop.
    pub async fn assign_code(&self, booking_id: Uuid, code: &str) -> ApiResult<CodeAssignment> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET booking_code = $2, updated_at = $3
            WHERE id = $1 AND booking_code IS NULL
            "#,
        )
        .bind(booking_id)
        .bind(code)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(CodeAssignment::Assigned),
            Ok(_) => Ok(CodeAssignment::AlreadyHasCode),
            Err(sqlx::Error::Database(db))
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                Ok(CodeAssignment::CodeTaken)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Flip the check-in flag exactly once
    ///
    /// The `check_in_validated = FALSE` guard is the serialization point for
    /// concurrent confirmation attempts; the loser of the race gets `false`.
    pub async fn mark_checked_in(&self, booking_id: Uuid, staff_user_id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET check_in_validated = TRUE,
                check_in_validated_at = $3,
                check_in_validated_by = $2,
                updated_at = $3
            WHERE id = $1 AND check_in_validated = FALSE
            "#,
        )
        .bind(booking_id)
        .bind(staff_user_id)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Flip the check-out flag exactly once; requires prior check-in
    pub async fn mark_checked_out(&self, booking_id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET check_out_validated = TRUE,
                check_out_validated_at = $2,
                updated_at = $2
            WHERE id = $1 AND check_in_validated = TRUE AND check_out_validated = FALSE
            "#,
        )
        .bind(booking_id)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
