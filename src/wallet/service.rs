//! Wallet service layer - atomic balance movements over the ledger store
//!
//! Every mutation runs as one transaction: a guarded `UPDATE … RETURNING` on
//! the wallet row (the row lock serializes concurrent operations on the same
//! wallet) followed by exactly one ledger entry computed from the returned
//! balances. Zero rows back from the guard means the wallet is missing or
//! the targeted balance would go negative.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::wallet::{LedgerEntry, LedgerEntryType, Wallet};

/// Attempts for a ledger operation hitting database contention
const LEDGER_RETRY_ATTEMPTS: u32 = 3;

/// Base backoff between contention retries
const LEDGER_RETRY_BACKOFF_MS: u64 = 50;

/// Wallet service for ledger-backed balance bookkeeping
#[derive(Clone)]
pub struct WalletService {
    db_pool: PgPool,
}

impl WalletService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Credit funds into a wallet's pending balance (booking hold)
    ///
    /// The wallet is created lazily on first credit.
    pub async fn credit_pending(
        &self,
        user_id: Uuid,
        currency: &str,
        amount: Decimal,
        reference: &str,
        description: &str,
        correlation_id: Option<&str>,
    ) -> ApiResult<LedgerEntry> {
        ensure_positive(amount)?;
        retrying(|| async {
            let mut tx = self.db_pool.begin().await.map_err(map_db_err)?;

            let wallet = self.ensure_wallet(&mut tx, user_id, currency).await?;
            let entry = apply_move(
                &mut tx,
                wallet.id,
                LedgerEntryType::Credit,
                Decimal::ZERO,
                amount,
                reference,
                description,
                correlation_id,
            )
            .await?;

            tx.commit().await.map_err(map_db_err)?;
            Ok(entry)
        })
        .await
    }

    /// Move held funds from pending to available (check-in release, see
    /// [`ReleaseEngine`](crate::wallet::ReleaseEngine))
    pub async fn release_to_available(
        &self,
        wallet_id: Uuid,
        amount: Decimal,
        reference: &str,
        description: &str,
        correlation_id: Option<&str>,
    ) -> ApiResult<LedgerEntry> {
        ensure_positive(amount)?;
        retrying(|| async {
            let mut tx = self.db_pool.begin().await.map_err(map_db_err)?;
            let entry = apply_move(
                &mut tx,
                wallet_id,
                LedgerEntryType::Release,
                amount,
                -amount,
                reference,
                description,
                correlation_id,
            )
            .await?;
            tx.commit().await.map_err(map_db_err)?;
            Ok(entry)
        })
        .await
    }

    /// Debit the available balance into the pending-withdrawal bucket, as
    /// part of the caller's transaction (withdrawal creation is atomic with
    /// the request insert)
    pub async fn hold_for_withdrawal_tx(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        amount: Decimal,
        reference: &str,
        description: &str,
        correlation_id: Option<&str>,
    ) -> ApiResult<LedgerEntry> {
        ensure_positive(amount)?;
        apply_move(
            conn,
            wallet_id,
            LedgerEntryType::Debit,
            -amount,
            amount,
            reference,
            description,
            correlation_id,
        )
        .await
    }

    /// Settle a completed withdrawal: the held amount leaves the wallet
    pub async fn settle_withdrawal_tx(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        amount: Decimal,
        reference: &str,
        description: &str,
        correlation_id: Option<&str>,
    ) -> ApiResult<LedgerEntry> {
        ensure_positive(amount)?;
        apply_move(
            conn,
            wallet_id,
            LedgerEntryType::Withdrawal,
            Decimal::ZERO,
            -amount,
            reference,
            description,
            correlation_id,
        )
        .await
    }

    /// Reverse a withdrawal hold back into the available balance
    pub async fn refund_withdrawal_tx(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        amount: Decimal,
        reference: &str,
        description: &str,
        correlation_id: Option<&str>,
    ) -> ApiResult<LedgerEntry> {
        ensure_positive(amount)?;
        apply_move(
            conn,
            wallet_id,
            LedgerEntryType::Credit,
            amount,
            -amount,
            reference,
            description,
            correlation_id,
        )
        .await
    }

    /// Get a wallet by owner
    pub async fn get_wallet_by_user(&self, user_id: Uuid) -> ApiResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(map_db_err)?;

        Ok(wallet)
    }

    /// Most recent ledger entry correlated to a booking or withdrawal
    pub async fn find_latest_correlated_entry(
        &self,
        wallet_id: Uuid,
        correlation_id: &str,
    ) -> ApiResult<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE wallet_id = $1 AND correlation_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(wallet_id)
        .bind(correlation_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(map_db_err)?;

        Ok(entry)
    }

    /// Ledger history for a wallet, newest first
    pub async fn entries_for(&self, wallet_id: Uuid, limit: i64) -> ApiResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.db_pool)
        .await
        .map_err(map_db_err)?;

        Ok(entries)
    }

    /// Deactivate a wallet (wallets are never deleted)
    pub async fn deactivate(&self, wallet_id: Uuid) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE wallets SET is_active = FALSE, updated_at = $2 WHERE id = $1",
        )
        .bind(wallet_id)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Wallet {} not found", wallet_id)));
        }
        Ok(())
    }

    /// Fetch the wallet for a user, creating it on first use
    async fn ensure_wallet(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        currency: &str,
    ) -> ApiResult<Wallet> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance, pending_balance, currency, is_active, created_at, updated_at)
            VALUES ($1, $2, 0, 0, $3, TRUE, $4, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(currency)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(map_db_err)?;

        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_db_err)?;

        Ok(wallet)
    }
}

/// One guarded balance movement plus its ledger entry
async fn apply_move(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    entry_type: LedgerEntryType,
    amount: Decimal,
    pending_amount: Decimal,
    reference: &str,
    description: &str,
    correlation_id: Option<&str>,
) -> ApiResult<LedgerEntry> {
    let now = Utc::now();

    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        UPDATE wallets
        SET balance = balance + $2, pending_balance = pending_balance + $3, updated_at = $4
        WHERE id = $1 AND balance + $2 >= 0 AND pending_balance + $3 >= 0
        RETURNING *
        "#,
    )
    .bind(wallet_id)
    .bind(amount)
    .bind(pending_amount)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_err)?;

    let wallet = match wallet {
        Some(w) => w,
        None => {
            let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM wallets WHERE id = $1")
                .bind(wallet_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(map_db_err)?;

            return Err(match exists {
                Some(_) => {
                    let targeted = if amount < Decimal::ZERO {
                        "available balance"
                    } else {
                        "pending balance"
                    };
                    ApiError::InsufficientFunds(format!(
                        "{} cannot cover the requested amount",
                        targeted
                    ))
                }
                None => ApiError::NotFound(format!("Wallet {} not found", wallet_id)),
            });
        }
    };

    let entry = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO ledger_entries (
            id, wallet_id, entry_type, amount, pending_amount,
            balance_before, balance_after, pending_before, pending_after,
            reference, description, correlation_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(wallet.id)
    .bind(entry_type)
    .bind(amount)
    .bind(pending_amount)
    .bind(wallet.balance - amount)
    .bind(wallet.balance)
    .bind(wallet.pending_balance - pending_amount)
    .bind(wallet.pending_balance)
    .bind(reference)
    .bind(description)
    .bind(correlation_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_err)?;

    Ok(entry)
}

fn ensure_positive(amount: Decimal) -> ApiResult<()> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::ValidationError(
            "Amount must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Keep the SQLSTATE visible so contention retries can recognize it
pub(crate) fn map_db_err(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &err {
        if let Some(code) = db.code() {
            return ApiError::DatabaseError(format!("[{}] {}", code, db.message()));
        }
    }
    err.into()
}

fn is_retryable(err: &ApiError) -> bool {
    matches!(
        err,
        ApiError::DatabaseError(msg)
            if msg.starts_with("[40001]") || msg.starts_with("[40P01]")
    )
}

/// Retry a ledger operation on serialization failure or deadlock
pub(crate) async fn retrying<T, F, Fut>(op: F) -> ApiResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if is_retryable(&err) && attempt < LEDGER_RETRY_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "Ledger operation hit contention, retrying");
                tokio::time::sleep(Duration::from_millis(
                    LEDGER_RETRY_BACKOFF_MS * u64::from(attempt),
                ))
                .await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
