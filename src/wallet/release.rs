//! Release engine: moves booking fund holds from pending to available
//!
//! Invoked exactly once per booking by the check-in confirmation path. The
//! engine itself is idempotent at the ledger level: a second invocation finds
//! no pending hold and does nothing.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::booking::{Beneficiary, BeneficiaryRole, Booking};
use crate::error::ApiResult;
use crate::wallet::{LedgerEntryType, WalletService};

/// What happened for one beneficiary during a release
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    pub user_id: Uuid,
    pub role: BeneficiaryRole,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub released: bool,
}

/// Moves held booking funds into the beneficiaries' available balances
#[derive(Clone)]
pub struct ReleaseEngine {
    wallets: WalletService,
}

impl ReleaseEngine {
    pub fn new(wallets: WalletService) -> Self {
        Self { wallets }
    }

    /// Release the fund hold of every beneficiary of a booking
    ///
    /// A beneficiary without a locatable pending hold is skipped with a
    /// warning rather than failing the check-in; ledger drift must never
    /// block a guest standing at the door.
    pub async fn release(&self, booking: &Booking) -> ApiResult<Vec<ReleaseOutcome>> {
        let correlation = booking.id.to_string();
        let mut outcomes = Vec::new();

        for beneficiary in booking.beneficiaries() {
            let outcome = self.release_one(booking, &beneficiary, &correlation).await?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn release_one(
        &self,
        booking: &Booking,
        beneficiary: &Beneficiary,
        correlation: &str,
    ) -> ApiResult<ReleaseOutcome> {
        let skipped = ReleaseOutcome {
            user_id: beneficiary.user_id,
            role: beneficiary.role,
            amount: Decimal::ZERO,
            released: false,
        };

        let wallet = match self.wallets.get_wallet_by_user(beneficiary.user_id).await? {
            Some(wallet) => wallet,
            None => {
                tracing::warn!(
                    booking_id = %booking.id,
                    user_id = %beneficiary.user_id,
                    "No wallet for beneficiary, skipping release"
                );
                return Ok(skipped);
            }
        };

        let hold = self
            .wallets
            .find_latest_correlated_entry(wallet.id, correlation)
            .await?;

        let hold = match hold {
            Some(entry)
                if entry.entry_type == LedgerEntryType::Credit
                    && entry.pending_amount > Decimal::ZERO =>
            {
                entry
            }
            Some(_) | None => {
                tracing::warn!(
                    booking_id = %booking.id,
                    wallet_id = %wallet.id,
                    "No pending hold found for booking, skipping release"
                );
                return Ok(skipped);
            }
        };

        let entry = self
            .wallets
            .release_to_available(
                wallet.id,
                hold.pending_amount,
                &format!("REL-{}", booking.id),
                &format!("Funds released after guest check-in ({})", booking.kind.label()),
                Some(correlation),
            )
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            wallet_id = %wallet.id,
            amount = %entry.amount,
            "Released booking hold to available balance"
        );

        Ok(ReleaseOutcome {
            user_id: beneficiary.user_id,
            role: beneficiary.role,
            amount: entry.amount,
            released: true,
        })
    }
}
