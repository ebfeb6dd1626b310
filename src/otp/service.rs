//! OTP authority: issuance, verification, rate limiting

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::{validate_e164, SmsGateway};
use crate::notify::templates;
use crate::otp::{IssuedOtp, OtpSession};

/// Wrong attempts before a session is burned
const MAX_ATTEMPTS: u8 = 3;

/// Generates, verifies and rate-limits one-time passcodes
///
/// One active session per user; issuing again (after the resend interval)
/// discards the previous session rather than merging with it.
pub struct OtpAuthority {
    sessions: RwLock<HashMap<Uuid, OtpSession>>,
    sms: Arc<dyn SmsGateway>,
    ttl: Duration,
    resend_interval: Duration,
}

impl OtpAuthority {
    pub fn new(sms: Arc<dyn SmsGateway>, ttl_seconds: i64, resend_interval_seconds: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            sms,
            ttl: Duration::seconds(ttl_seconds),
            resend_interval: Duration::seconds(resend_interval_seconds),
        }
    }

    /// Issue a passcode bound to the user's registered phone and the exact
    /// withdrawal amount, and attempt SMS delivery
    ///
    /// `requested_phone` must match the phone on file; accepting an
    /// unverified caller-supplied number would let an attacker redirect the
    /// code. The caller handles the email fallback when `sms_delivered` is
    /// false.
    pub async fn issue(
        &self,
        user_id: Uuid,
        phone_on_file: &str,
        requested_phone: &str,
        amount: Decimal,
        currency: &str,
    ) -> ApiResult<IssuedOtp> {
        self.issue_at(Utc::now(), user_id, phone_on_file, requested_phone, amount, currency)
            .await
    }

    async fn issue_at(
        &self,
        now: DateTime<Utc>,
        user_id: Uuid,
        phone_on_file: &str,
        requested_phone: &str,
        amount: Decimal,
        currency: &str,
    ) -> ApiResult<IssuedOtp> {
        validate_e164(requested_phone)?;

        if requested_phone != phone_on_file {
            return Err(ApiError::ValidationError(
                "Phone number does not match the number on file".to_string(),
            ));
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let expires_at = now + self.ttl;

        {
            let mut sessions = self.sessions.write().await;

            if let Some(existing) = sessions.get(&user_id) {
                if now - existing.issued_at < self.resend_interval {
                    return Err(ApiError::TooManyRequests);
                }
            }

            sessions.insert(
                user_id,
                OtpSession {
                    code: code.clone(),
                    phone: requested_phone.to_string(),
                    amount,
                    currency: currency.to_string(),
                    attempts: 0,
                    issued_at: now,
                    expires_at,
                },
            );
        }

        let message = templates::otp_sms(&code, amount, currency);
        let sms_delivered = match self.sms.send(requested_phone, &message).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "OTP SMS delivery failed");
                false
            }
        };

        Ok(IssuedOtp {
            code,
            expires_at,
            sms_delivered,
        })
    }

    /// Verify a passcode against the user's active session
    ///
    /// Success is single-use: the session is discarded. Amount equality is
    /// exact fixed-point comparison; a one-minor-unit mismatch fails.
    pub async fn verify(&self, user_id: Uuid, otp: &str, amount: Decimal) -> ApiResult<()> {
        self.verify_at(Utc::now(), user_id, otp, amount).await
    }

    async fn verify_at(
        &self,
        now: DateTime<Utc>,
        user_id: Uuid,
        otp: &str,
        amount: Decimal,
    ) -> ApiResult<()> {
        let mut sessions = self.sessions.write().await;

        let session = match sessions.get_mut(&user_id) {
            Some(session) => session,
            None => {
                return Err(ApiError::OtpExpired(
                    "No active one-time code for this account".to_string(),
                ))
            }
        };

        if now > session.expires_at {
            sessions.remove(&user_id);
            return Err(ApiError::OtpExpired(
                "The one-time code has expired".to_string(),
            ));
        }

        if session.attempts >= MAX_ATTEMPTS {
            sessions.remove(&user_id);
            return Err(ApiError::TooManyAttempts);
        }

        if session.code != otp {
            session.attempts += 1;
            return Err(ApiError::InvalidCode);
        }

        if session.amount != amount {
            sessions.remove(&user_id);
            return Err(ApiError::AmountMismatch);
        }

        sessions.remove(&user_id);
        Ok(())
    }

    /// Drop a user's session, e.g. after both delivery channels failed
    pub async fn discard(&self, user_id: Uuid) {
        self.sessions.write().await.remove(&user_id);
    }

    /// Remove expired sessions; returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at >= now);
        before - sessions.len()
    }
}

/// Background job dropping expired OTP sessions
pub async fn session_purger(authority: Arc<OtpAuthority>) {
    tracing::info!("Starting OTP session purger");

    loop {
        tokio::time::sleep(StdDuration::from_secs(60)).await;

        let purged = authority.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired OTP sessions");
        }
    }
}
