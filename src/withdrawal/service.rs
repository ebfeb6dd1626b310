//! Withdrawal service layer - lifecycle management and balance movements
//!
//! Every status transition is a guarded conditional update; transitions that
//! move money (creation hold, settlement, refunds) share one transaction with
//! the status change so a crash can never leave a half-applied withdrawal.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::NotificationService;
use crate::otp::OtpAuthority;
use crate::payments::PaymentStatus;
use crate::user::UserStore;
use crate::wallet::WalletService;
use crate::withdrawal::{
    ApprovalPolicy, CreateWithdrawalRequest, ListWithdrawalsQuery, OtpIssueReceipt,
    RequestOtpBody, WithdrawalRequest, WithdrawalStatus,
};

/// Withdrawal service owning the request state machine
pub struct WithdrawalService {
    db_pool: PgPool,
    wallets: WalletService,
    users: UserStore,
    otp: Arc<OtpAuthority>,
    notifier: Arc<NotificationService>,
    policy: Arc<dyn ApprovalPolicy>,
    high_value_threshold: Decimal,
    expiry_hours: i64,
}

impl WithdrawalService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        wallets: WalletService,
        users: UserStore,
        otp: Arc<OtpAuthority>,
        notifier: Arc<NotificationService>,
        policy: Arc<dyn ApprovalPolicy>,
        high_value_threshold: Decimal,
        expiry_hours: i64,
    ) -> Self {
        Self {
            db_pool,
            wallets,
            users,
            otp,
            notifier,
            policy,
            high_value_threshold,
            expiry_hours,
        }
    }

    /// Issue a withdrawal OTP over SMS, falling back to email with the same
    /// code when SMS delivery fails
    pub async fn request_otp(&self, body: RequestOtpBody) -> ApiResult<OtpIssueReceipt> {
        let user = self.users.find(body.user_id).await?;

        let issued = self
            .otp
            .issue(user.id, &user.phone, &body.phone, body.amount, &body.currency)
            .await?;

        if issued.sms_delivered {
            return Ok(OtpIssueReceipt {
                expires_at: issued.expires_at,
                channel: "sms",
            });
        }

        tracing::warn!(user_id = %user.id, "OTP SMS failed, falling back to email");

        match self
            .notifier
            .send_otp_email(&user.email, &issued.code, body.amount, &body.currency)
            .await
        {
            Ok(()) => Ok(OtpIssueReceipt {
                expires_at: issued.expires_at,
                channel: "email",
            }),
            Err(err) => {
                // Neither channel worked; do not leave a code in flight
                self.otp.discard(user.id).await;
                tracing::error!(user_id = %user.id, error = %err, "OTP delivery failed on both channels");
                Err(ApiError::ProviderError(
                    "Could not deliver the one-time code over SMS or email".to_string(),
                ))
            }
        }
    }

    /// Create a withdrawal request
    ///
    /// Requires a verified OTP for the exact amount, an approved KYC record,
    /// a verified phone above the high-value threshold, and sufficient
    /// available balance. The balance hold, ledger entry and request row are
    /// one atomic unit; nothing is created when any check fails.
    pub async fn request_withdrawal(
        &self,
        req: CreateWithdrawalRequest,
    ) -> ApiResult<WithdrawalRequest> {
        req.validate()?;

        let user = self.users.find(req.user_id).await?;

        if !user.kyc_approved() {
            return Err(ApiError::Unauthorized(
                "Account has not completed KYC verification".to_string(),
            ));
        }

        if req.amount > self.high_value_threshold && !user.phone_verified {
            return Err(ApiError::Unauthorized(
                "High-value withdrawals require a verified phone number".to_string(),
            ));
        }

        self.otp.verify(user.id, &req.otp, req.amount).await?;

        let wallet = self
            .wallets
            .get_wallet_by_user(user.id)
            .await?
            .ok_or_else(|| {
                ApiError::InsufficientFunds("No wallet exists for this account".to_string())
            })?;

        if !wallet.is_active {
            return Err(ApiError::Unauthorized("Wallet is deactivated".to_string()));
        }

        if wallet.currency != req.currency {
            return Err(ApiError::ValidationError(format!(
                "Wallet currency is {}, not {}",
                wallet.currency, req.currency
            )));
        }

        let request_id = Uuid::new_v4();
        let reference = format!("WD-{}", request_id.simple());
        let correlation = request_id.to_string();

        let request = crate::wallet::retrying(|| async {
            let mut tx = self.db_pool.begin().await?;

            WalletService::hold_for_withdrawal_tx(
                &mut tx,
                wallet.id,
                req.amount,
                &reference,
                "Withdrawal amount held for payout",
                Some(&correlation),
            )
            .await?;

            let now = Utc::now();
            let request = sqlx::query_as::<_, WithdrawalRequest>(
                r#"
                INSERT INTO withdrawal_requests (
                    id, user_id, amount, currency, method, destination,
                    reference, status, linked_payout_method_id, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $9)
                RETURNING *
                "#,
            )
            .bind(request_id)
            .bind(user.id)
            .bind(req.amount)
            .bind(&req.currency)
            .bind(req.method)
            .bind(Json(req.destination.clone()))
            .bind(&reference)
            .bind(req.linked_payout_method_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(request)
        })
        .await?;

        tracing::info!(
            request_id = %request.id,
            user_id = %user.id,
            amount = %request.amount,
            "Withdrawal request created"
        );

        let request = if self.policy.auto_approve(&request) {
            tracing::info!(request_id = %request.id, "Withdrawal auto-approved by policy");
            self.transition(
                request.id,
                WithdrawalStatus::Pending,
                WithdrawalStatus::Approved,
                None,
            )
            .await?
        } else {
            request
        };

        self.notify_update(&request);
        Ok(request)
    }

    /// Approve a pending request (admin action or auto-approval policy)
    pub async fn approve(&self, id: Uuid) -> ApiResult<WithdrawalRequest> {
        let request = self
            .transition(id, WithdrawalStatus::Pending, WithdrawalStatus::Approved, None)
            .await?;
        self.notify_update(&request);
        Ok(request)
    }

    /// Reject a pending request; the held amount returns to the wallet
    pub async fn reject(&self, id: Uuid, reason: &str) -> ApiResult<WithdrawalRequest> {
        let request = self
            .terminate_with_refund(
                id,
                (WithdrawalStatus::Pending, None),
                WithdrawalStatus::Rejected,
                Some(reason),
            )
            .await?;
        self.notify_update(&request);
        Ok(request)
    }

    /// Cancel a request on behalf of its owner; only PENDING and APPROVED
    /// requests can still be cancelled
    pub async fn cancel(&self, id: Uuid, user_id: Uuid) -> ApiResult<WithdrawalRequest> {
        let current = self.get(id).await?;
        if current.user_id != user_id {
            return Err(ApiError::Unauthorized(
                "Withdrawal belongs to another account".to_string(),
            ));
        }

        let request = self
            .terminate_with_refund(
                id,
                (WithdrawalStatus::Pending, Some(WithdrawalStatus::Approved)),
                WithdrawalStatus::Cancelled,
                Some("Cancelled by account owner"),
            )
            .await?;
        self.notify_update(&request);
        Ok(request)
    }

    /// Mark an approved request as handed to the payout provider
    pub async fn start_processing(&self, id: Uuid) -> ApiResult<WithdrawalRequest> {
        let request = self
            .transition(
                id,
                WithdrawalStatus::Approved,
                WithdrawalStatus::Processing,
                None,
            )
            .await?;
        self.notify_update(&request);
        Ok(request)
    }

    /// Consume a payout webhook keyed by our withdrawal reference
    pub async fn handle_payout_result(&self, reference: &str, raw_status: &str) -> ApiResult<()> {
        let request = self.find_by_reference(reference).await?;

        match PaymentStatus::from_provider(raw_status) {
            PaymentStatus::Completed => {
                let request = self.complete(request.id).await?;
                self.notify_update(&request);
            }
            PaymentStatus::Failed => {
                let request = self
                    .terminate_with_refund(
                        request.id,
                        (WithdrawalStatus::Processing, None),
                        WithdrawalStatus::Failed,
                        Some(&format!("Provider reported payout failure ({})", raw_status)),
                    )
                    .await?;
                self.notify_update(&request);
            }
            PaymentStatus::Pending => {
                tracing::info!(reference = %reference, "Payout still pending at provider");
            }
        }

        Ok(())
    }

    /// Move APPROVED requests idle past the configured window to EXPIRED,
    /// refunding each
    pub async fn expire_stale(&self) -> ApiResult<Vec<WithdrawalRequest>> {
        let cutoff = Utc::now() - Duration::hours(self.expiry_hours);

        let stale: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM withdrawal_requests
            WHERE status = 'approved' AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db_pool)
        .await?;

        let mut expired = Vec::new();
        for id in stale {
            match self
                .terminate_with_refund(
                    id,
                    (WithdrawalStatus::Approved, None),
                    WithdrawalStatus::Expired,
                    Some("No processing within the approval window"),
                )
                .await
            {
                Ok(request) => {
                    tracing::warn!(request_id = %id, "Withdrawal expired without processing");
                    self.notify_update(&request);
                    expired.push(request);
                }
                // A concurrent transition won; nothing to expire anymore
                Err(ApiError::Conflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(expired)
    }

    /// Get a request by id
    pub async fn get(&self, id: Uuid) -> ApiResult<WithdrawalRequest> {
        let request = sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        request.ok_or_else(|| ApiError::NotFound(format!("Withdrawal {} not found", id)))
    }

    /// List requests with filtering and pagination
    pub async fn list(&self, query: ListWithdrawalsQuery) -> ApiResult<Vec<WithdrawalRequest>> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM withdrawal_requests WHERE 1=1");

        if let Some(user_id) = query.user_id {
            query_builder.push(" AND user_id = ");
            query_builder.push_bind(user_id);
        }
        if let Some(status) = query.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(i64::from(limit));
        query_builder.push(" OFFSET ");
        query_builder.push_bind(i64::from(offset));

        let requests = query_builder
            .build_query_as::<WithdrawalRequest>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(requests)
    }

    async fn find_by_reference(&self, reference: &str) -> ApiResult<WithdrawalRequest> {
        let request = sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE reference = $1",
        )
        .bind(reference)
        .fetch_optional(&self.db_pool)
        .await?;

        request.ok_or_else(|| {
            ApiError::NotFound(format!("No withdrawal with reference {}", reference))
        })
    }

    /// Settle a PROCESSING request as COMPLETED; the held amount leaves the
    /// wallet in the same transaction as the status change
    async fn complete(&self, id: Uuid) -> ApiResult<WithdrawalRequest> {
        crate::wallet::retrying(|| async {
            let mut tx = self.db_pool.begin().await?;

            let now = Utc::now();
            let request = sqlx::query_as::<_, WithdrawalRequest>(
                r#"
                UPDATE withdrawal_requests
                SET status = 'completed', updated_at = $2, completed_at = $2
                WHERE id = $1 AND status = 'processing'
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            let request = match request {
                Some(request) => request,
                None => return Err(self.transition_conflict(id, WithdrawalStatus::Completed).await),
            };

            let wallet_id = self.wallet_id_for(&mut tx, request.user_id).await?;
            WalletService::settle_withdrawal_tx(
                &mut tx,
                wallet_id,
                request.amount,
                &format!("PAY-{}", request.reference),
                "Withdrawal paid out",
                Some(&request.id.to_string()),
            )
            .await?;

            tx.commit().await?;

            tracing::info!(request_id = %request.id, "Withdrawal completed");
            Ok(request)
        })
        .await
    }

    /// One guarded status update with no fund movement
    async fn transition(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
        failure_reason: Option<&str>,
    ) -> ApiResult<WithdrawalRequest> {
        let request = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = $3, failure_reason = COALESCE($4, failure_reason), updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(failure_reason)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?;

        match request {
            Some(request) => Ok(request),
            None => Err(self.transition_conflict(id, to).await),
        }
    }

    /// Guarded terminal transition plus the compensating wallet credit, as
    /// one transaction
    async fn terminate_with_refund(
        &self,
        id: Uuid,
        from: (WithdrawalStatus, Option<WithdrawalStatus>),
        to: WithdrawalStatus,
        failure_reason: Option<&str>,
    ) -> ApiResult<WithdrawalRequest> {
        debug_assert!(to.requires_refund());
        let (from_a, from_b) = from;

        crate::wallet::retrying(|| async {
            let mut tx = self.db_pool.begin().await?;

            let now = Utc::now();
            let request = sqlx::query_as::<_, WithdrawalRequest>(
                r#"
                UPDATE withdrawal_requests
                SET status = $4, failure_reason = COALESCE($5, failure_reason),
                    updated_at = $6, completed_at = $6
                WHERE id = $1 AND (status = $2 OR status = $3)
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(from_a)
            .bind(from_b.unwrap_or(from_a))
            .bind(to)
            .bind(failure_reason)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            let request = match request {
                Some(request) => request,
                None => return Err(self.transition_conflict(id, to).await),
            };

            let wallet_id = self.wallet_id_for(&mut tx, request.user_id).await?;
            WalletService::refund_withdrawal_tx(
                &mut tx,
                wallet_id,
                request.amount,
                &format!("RFD-{}", request.reference),
                &format!("Withdrawal {} refund", to.as_str()),
                Some(&request.id.to_string()),
            )
            .await?;

            tx.commit().await?;

            tracing::info!(
                request_id = %request.id,
                status = to.as_str(),
                "Withdrawal terminated and refunded"
            );
            Ok(request)
        })
        .await
    }

    async fn wallet_id_for(
        &self,
        conn: &mut sqlx::PgConnection,
        user_id: Uuid,
    ) -> ApiResult<Uuid> {
        let wallet_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;

        wallet_id
            .ok_or_else(|| ApiError::InternalError(format!("No wallet for user {}", user_id)))
    }

    /// Shape the error for a transition whose guard matched no row
    async fn transition_conflict(&self, id: Uuid, to: WithdrawalStatus) -> ApiError {
        match self.get(id).await {
            Ok(current) => ApiError::Conflict(format!(
                "Cannot move withdrawal from {} to {}",
                current.status.as_str(),
                to.as_str()
            )),
            Err(err) => err,
        }
    }

    /// Fire owner and admin notifications for a status change; failures are
    /// logged by the notifier and never affect the transition
    fn notify_update(&self, request: &WithdrawalRequest) {
        let users = self.users.clone();
        let notifier = self.notifier.clone();
        let request = request.clone();

        tokio::spawn(async move {
            match users.find(request.user_id).await {
                Ok(user) => notifier.notify_withdrawal_update(&user, &request).await,
                Err(err) => {
                    tracing::warn!(
                        request_id = %request.id,
                        error = %err,
                        "Could not load user for withdrawal notification"
                    );
                }
            }
        });
    }
}
