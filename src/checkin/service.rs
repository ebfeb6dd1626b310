//! Check-in service layer - two-phase verification and fund release

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::booking::{Booking, BookingStore, CodeAssignment, PaymentMode};
use crate::checkin::{
    generate_booking_code, CheckInConfirmation, CheckInLookup, CheckOutConfirmation,
    ConfirmRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::notify::NotificationService;
use crate::payments::PaymentService;
use crate::wallet::ReleaseEngine;

/// Bounded retries when allocating a globally unique booking code
const CODE_GENERATION_ATTEMPTS: u32 = 10;

/// Wrong confirmation codes tolerated per booking before lock-out
const MAX_CONFIRM_ATTEMPTS: u32 = 10;

/// In-memory per-booking counter of failed confirmation attempts
///
/// The request-level rate limiter still applies; this counter closes the gap
/// where a party to the booking brute-forces the code itself.
struct AttemptTracker {
    counts: RwLock<HashMap<Uuid, u32>>,
}

impl AttemptTracker {
    fn new() -> Self {
        Self {
            counts: RwLock::new(HashMap::new()),
        }
    }

    async fn exhausted(&self, booking_id: Uuid) -> bool {
        self.counts
            .read()
            .await
            .get(&booking_id)
            .is_some_and(|&count| count >= MAX_CONFIRM_ATTEMPTS)
    }

    async fn record_failure(&self, booking_id: Uuid) {
        let mut counts = self.counts.write().await;
        *counts.entry(booking_id).or_insert(0) += 1;
    }

    async fn clear(&self, booking_id: Uuid) {
        self.counts.write().await.remove(&booking_id);
    }
}

/// Check-in verifier gating the release of held booking funds
pub struct CheckInService {
    bookings: BookingStore,
    payments: PaymentService,
    release: ReleaseEngine,
    notifier: Arc<NotificationService>,
    attempts: AttemptTracker,
}

impl CheckInService {
    pub fn new(
        bookings: BookingStore,
        payments: PaymentService,
        release: ReleaseEngine,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            bookings,
            payments,
            release,
            notifier,
            attempts: AttemptTracker::new(),
        }
    }

    /// Phase 1: resolve and authorize the booking, lazily issuing the code
    ///
    /// The first lookup after payment completion generates the guest's code
    /// and dispatches it over SMS and email in parallel; later lookups only
    /// return booking details.
    pub async fn lookup(&self, booking_id: Uuid, staff_user_id: Uuid) -> ApiResult<CheckInLookup> {
        let booking = self.bookings.find(booking_id).await?;
        self.authorize(&booking, staff_user_id)?;

        if booking.check_in.check_in_validated {
            return Err(ApiError::AlreadyCheckedIn);
        }

        self.ensure_payment_ready(&booking).await?;

        let mut code_generated = false;
        if booking.check_in.booking_code.is_none() {
            if let Some(code) = self.allocate_code(booking_id).await? {
                code_generated = true;
                self.notifier.send_booking_code(&booking, &code).await;
            }
            // A concurrent lookup won the allocation; it also sent the code
        }

        Ok(CheckInLookup::from_booking(&booking, code_generated))
    }

    /// Phase 2: verify the guest's code and release the held funds
    ///
    /// The optimistic flag flip is the serialization point: of two
    /// concurrent confirmations exactly one releases funds, the other gets
    /// `AlreadyCheckedIn`.
    pub async fn confirm(
        &self,
        booking_id: Uuid,
        req: ConfirmRequest,
    ) -> ApiResult<CheckInConfirmation> {
        let booking = self.bookings.find(booking_id).await?;
        self.authorize(&booking, req.staff_user_id)?;

        if booking.check_in.check_in_validated {
            return Err(ApiError::AlreadyCheckedIn);
        }

        self.ensure_payment_ready(&booking).await?;

        if self.attempts.exhausted(booking_id).await {
            return Err(ApiError::TooManyAttempts);
        }

        let stored = booking.check_in.booking_code.as_deref().ok_or_else(|| {
            ApiError::ValidationError(
                "No check-in code has been issued for this booking".to_string(),
            )
        })?;

        // Case-sensitive comparison; the alphabet is upper-case only
        if stored != req.code {
            self.attempts.record_failure(booking_id).await;
            return Err(ApiError::InvalidCode);
        }

        if !self.bookings.mark_checked_in(booking_id, req.staff_user_id).await? {
            return Err(ApiError::AlreadyCheckedIn);
        }

        let released = self.release.release(&booking).await?;
        self.attempts.clear(booking_id).await;

        tracing::info!(
            booking_id = %booking_id,
            staff_user_id = %req.staff_user_id,
            beneficiaries = released.len(),
            "Check-in confirmed"
        );

        let notifier = self.notifier.clone();
        let notified = booking.clone();
        let instructions = req.instructions.clone();
        tokio::spawn(async move {
            notifier
                .notify_checkin_confirmed(&notified, instructions.as_deref())
                .await;
        });

        Ok(CheckInConfirmation {
            booking_id,
            checked_in_at: Utc::now(),
            released,
        })
    }

    /// One-phase check-out; requires prior check-in, moves no funds
    pub async fn confirm_check_out(
        &self,
        booking_id: Uuid,
        staff_user_id: Uuid,
    ) -> ApiResult<CheckOutConfirmation> {
        let booking = self.bookings.find(booking_id).await?;
        self.authorize(&booking, staff_user_id)?;

        if !booking.check_in.check_in_validated {
            return Err(ApiError::Conflict(
                "Guest has not checked in yet".to_string(),
            ));
        }
        if booking.check_in.check_out_validated {
            return Err(ApiError::AlreadyCheckedOut);
        }

        if !self.bookings.mark_checked_out(booking_id).await? {
            return Err(ApiError::AlreadyCheckedOut);
        }

        tracing::info!(booking_id = %booking_id, "Check-out confirmed");

        let notifier = self.notifier.clone();
        let notified = booking.clone();
        tokio::spawn(async move {
            notifier.notify_checkout_confirmed(&notified).await;
        });

        Ok(CheckOutConfirmation {
            booking_id,
            checked_out_at: Utc::now(),
        })
    }

    fn authorize(&self, booking: &Booking, staff_user_id: Uuid) -> ApiResult<()> {
        if booking.is_party(staff_user_id) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(
                "Staff user is not a party to this booking".to_string(),
            ))
        }
    }

    async fn ensure_payment_ready(&self, booking: &Booking) -> ApiResult<()> {
        if self.payments.payment_ready(booking).await? {
            return Ok(());
        }

        Err(ApiError::PaymentNotCompleted(
            match booking.payment_mode {
                PaymentMode::Online => "Booking payment has not been completed",
                PaymentMode::OnArrival => "Arrival payment has not been collected",
            }
            .to_string(),
        ))
    }

    /// Allocate a globally unique code for the booking
    ///
    /// Returns `None` when a concurrent lookup attached a code first.
    async fn allocate_code(&self, booking_id: Uuid) -> ApiResult<Option<String>> {
        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let code = generate_booking_code();
            match self.bookings.assign_code(booking_id, &code).await? {
                CodeAssignment::Assigned => return Ok(Some(code)),
                CodeAssignment::AlreadyHasCode => return Ok(None),
                CodeAssignment::CodeTaken => continue,
            }
        }

        Err(ApiError::InternalError(format!(
            "Could not allocate a unique booking code after {} attempts",
            CODE_GENERATION_ATTEMPTS
        )))
    }
}
