//! Wallet and ledger models
//!
//! Balance math is fixed-point `Decimal` end to end; floats never touch
//! monetary amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-user wallet holding available and pending funds
///
/// Created lazily on first credit; never deleted, only deactivated.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub pending_balance: Decimal,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of balance-affecting event
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType {
    Credit,
    Debit,
    Withdrawal,
    Release,
}

/// Immutable, append-only record of a single balance-affecting event
///
/// `amount` is the signed effect on the available balance and
/// `pending_amount` the signed effect on the pending balance, so the sum of
/// `amount + pending_amount` over a wallet's entries always equals
/// `balance + pending_balance`. The before/after columns snapshot each
/// balance around the entry: `balance_after = balance_before + amount` and
/// `pending_after = pending_before + pending_amount`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub entry_type: LedgerEntryType,
    pub amount: Decimal,
    pub pending_amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub pending_before: Decimal,
    pub pending_after: Decimal,
    pub reference: String,
    pub description: String,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Wallet summary returned by the API
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub pending_balance: Decimal,
    pub currency: String,
    pub is_active: bool,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            user_id: wallet.user_id,
            balance: wallet.balance,
            pending_balance: wallet.pending_balance,
            currency: wallet.currency,
            is_active: wallet.is_active,
        }
    }
}
