//! Notification service - renders and dispatches guest, staff and admin
//! messages
//!
//! Everything here is best-effort: failures are logged and swallowed, except
//! for the OTP email fallback whose outcome the caller needs.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::booking::Booking;
use crate::error::ApiResult;
use crate::notify::templates;
use crate::notify::{EmailGateway, SmsGateway};
use crate::user::{UserProfile, UserStore};
use crate::withdrawal::WithdrawalRequest;

pub struct NotificationService {
    sms: Arc<dyn SmsGateway>,
    email: Arc<dyn EmailGateway>,
    users: UserStore,
    admin_email: String,
    admin_phone: Option<String>,
}

impl NotificationService {
    pub fn new(
        sms: Arc<dyn SmsGateway>,
        email: Arc<dyn EmailGateway>,
        users: UserStore,
        admin_email: String,
        admin_phone: Option<String>,
    ) -> Self {
        Self {
            sms,
            email,
            users,
            admin_email,
            admin_phone,
        }
    }

    /// Dispatch a freshly generated check-in code to the guest over SMS and
    /// email in parallel; neither channel blocks the other
    pub async fn send_booking_code(&self, booking: &Booking, code: &str) {
        let sms_message = templates::booking_code_sms(booking, code);
        let (subject, html, text) = templates::booking_code_email(booking, code);

        let (sms_result, email_result) = tokio::join!(
            self.sms.send(&booking.guest_phone, &sms_message),
            self.email.send(&booking.guest_email, &subject, &html, &text),
        );

        if let Err(err) = sms_result {
            tracing::warn!(booking_id = %booking.id, error = %err, "Check-in code SMS failed");
        }
        if let Err(err) = email_result {
            tracing::warn!(booking_id = %booking.id, error = %err, "Check-in code email failed");
        }
    }

    /// Guest and staff messages after a confirmed check-in
    pub async fn notify_checkin_confirmed(&self, booking: &Booking, instructions: Option<&str>) {
        let (subject, html, text) = templates::checkin_guest_email(booking, instructions);
        if let Err(err) = self
            .email
            .send(&booking.guest_email, &subject, &html, &text)
            .await
        {
            tracing::warn!(booking_id = %booking.id, error = %err, "Guest check-in email failed");
        }

        let (subject, html, text) = templates::checkin_staff_email(booking);
        for beneficiary in booking.beneficiaries() {
            match self.users.find(beneficiary.user_id).await {
                Ok(staff) => {
                    if let Err(err) = self.email.send(&staff.email, &subject, &html, &text).await {
                        tracing::warn!(
                            booking_id = %booking.id,
                            user_id = %staff.id,
                            error = %err,
                            "Staff check-in email failed"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        booking_id = %booking.id,
                        user_id = %beneficiary.user_id,
                        error = %err,
                        "Could not resolve staff contact"
                    );
                }
            }
        }
    }

    /// Guest message after check-out
    pub async fn notify_checkout_confirmed(&self, booking: &Booking) {
        let (subject, html, text) = templates::checkout_guest_email(booking);
        if let Err(err) = self
            .email
            .send(&booking.guest_email, &subject, &html, &text)
            .await
        {
            tracing::warn!(booking_id = %booking.id, error = %err, "Check-out email failed");
        }
    }

    /// OTP fallback channel; the result decides whether the session survives
    pub async fn send_otp_email(
        &self,
        to: &str,
        code: &str,
        amount: Decimal,
        currency: &str,
    ) -> ApiResult<()> {
        let (subject, html, text) = templates::otp_email(code, amount, currency);
        self.email.send(to, &subject, &html, &text).await
    }

    /// Owner (email + SMS) and admin channel for every withdrawal transition
    pub async fn notify_withdrawal_update(&self, user: &UserProfile, request: &WithdrawalRequest) {
        let (subject, html, text) = templates::withdrawal_email(request);
        if let Err(err) = self.email.send(&user.email, &subject, &html, &text).await {
            tracing::warn!(request_id = %request.id, error = %err, "Withdrawal email failed");
        }

        let sms_message = templates::withdrawal_sms(request);
        if let Err(err) = self.sms.send(&user.phone, &sms_message).await {
            tracing::warn!(request_id = %request.id, error = %err, "Withdrawal SMS failed");
        }

        let (subject, html, text) = templates::admin_withdrawal_email(request);
        if let Err(err) = self.email.send(&self.admin_email, &subject, &html, &text).await {
            tracing::warn!(request_id = %request.id, error = %err, "Admin withdrawal email failed");
        }

        if let Some(admin_phone) = &self.admin_phone {
            if request.status.requires_refund() {
                if let Err(err) = self.sms.send(admin_phone, &sms_message).await {
                    tracing::warn!(request_id = %request.id, error = %err, "Admin withdrawal SMS failed");
                }
            }
        }
    }

    /// Free-form alert to the admin channel (webhook processing failures etc.)
    pub async fn admin_alert(&self, subject: &str, body: &str) {
        let html = format!("<p>{}</p>", body);
        if let Err(err) = self
            .email
            .send(&self.admin_email, subject, &html, body)
            .await
        {
            tracing::error!(error = %err, "Admin alert email failed");
        }
    }
}
