//! Ledger consistency tests for the wallet service

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use uuid::Uuid;

    use tripvault_server::wallet::{LedgerEntryType, WalletService};

    /// Helper to create a test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/tripvault_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    /// Seed a user row so wallet foreign keys hold
    async fn seed_user(pool: &PgPool) -> Uuid {
        let user_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, phone, phone_verified, kyc_status)
            VALUES ($1, 'Test Host', $2, $3, TRUE, 'approved')
            "#,
        )
        .bind(user_id)
        .bind(format!("host-{}@example.test", user_id.simple()))
        .bind(format!("+2376700{:05}", rand_suffix()))
        .execute(pool)
        .await
        .expect("Failed to seed user");
        user_id
    }

    fn rand_suffix() -> u32 {
        use std::time::{SystemTime, UNIX_EPOCH};
        (SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos())
            % 100_000
    }

    fn usd(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_credit_then_release_moves_pending_to_available() {
        let pool = setup_test_db().await;
        let wallets = WalletService::new(pool.clone());
        let user_id = seed_user(&pool).await;
        let booking = Uuid::new_v4().to_string();

        // Wallet is created lazily on first credit
        wallets
            .credit_pending(user_id, "USD", usd(10_000), "BKG-test", "hold", Some(&booking))
            .await
            .expect("credit failed");

        let wallet = wallets
            .get_wallet_by_user(user_id)
            .await
            .unwrap()
            .expect("wallet should exist after first credit");
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.pending_balance, usd(10_000));

        // Release the full hold
        let entry = wallets
            .release_to_available(wallet.id, usd(10_000), "REL-test", "release", Some(&booking))
            .await
            .expect("release failed");

        assert_eq!(entry.entry_type, LedgerEntryType::Release);
        assert_eq!(entry.amount, usd(10_000));
        assert_eq!(entry.pending_amount, usd(-10_000));

        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, usd(10_000));
        assert_eq!(wallet.pending_balance, Decimal::ZERO);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_ledger_sum_matches_balances_after_mixed_operations() {
        let pool = setup_test_db().await;
        let wallets = WalletService::new(pool.clone());
        let user_id = seed_user(&pool).await;

        wallets
            .credit_pending(user_id, "USD", usd(20_000), "BKG-1", "hold", Some("b1"))
            .await
            .unwrap();
        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();

        wallets
            .release_to_available(wallet.id, usd(20_000), "REL-1", "release", Some("b1"))
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        WalletService::hold_for_withdrawal_tx(&mut tx, wallet.id, usd(5_000), "WD-1", "hold", Some("w1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        WalletService::refund_withdrawal_tx(&mut tx, wallet.id, usd(5_000), "RFD-1", "refund", Some("w1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();
        let entries = wallets.entries_for(wallet.id, 100).await.unwrap();

        let ledger_sum: Decimal = entries.iter().map(|e| e.amount + e.pending_amount).sum();
        assert_eq!(ledger_sum, wallet.balance + wallet.pending_balance);
        assert!(wallet.balance >= Decimal::ZERO);
        assert!(wallet.pending_balance >= Decimal::ZERO);

        // Each entry obeys the per-entry snapshot law
        for entry in &entries {
            assert_eq!(entry.balance_after, entry.balance_before + entry.amount);
            assert_eq!(entry.pending_after, entry.pending_before + entry.pending_amount);
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_release_beyond_pending_is_rejected() {
        let pool = setup_test_db().await;
        let wallets = WalletService::new(pool.clone());
        let user_id = seed_user(&pool).await;

        wallets
            .credit_pending(user_id, "USD", usd(1_000), "BKG-2", "hold", Some("b2"))
            .await
            .unwrap();
        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();

        let result = wallets
            .release_to_available(wallet.id, usd(1_001), "REL-2", "release", Some("b2"))
            .await;

        assert!(result.is_err(), "over-release must fail");

        // Nothing moved
        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(wallet.pending_balance, usd(1_000));
        assert_eq!(wallet.balance, Decimal::ZERO);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_holds_cannot_both_win_one_balance() {
        let pool = setup_test_db().await;
        let wallets = WalletService::new(pool.clone());
        let user_id = seed_user(&pool).await;

        wallets
            .credit_pending(user_id, "USD", usd(5_000), "BKG-3", "hold", Some("b3"))
            .await
            .unwrap();
        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();
        wallets
            .release_to_available(wallet.id, usd(5_000), "REL-3", "release", Some("b3"))
            .await
            .unwrap();

        // Two concurrent withdrawal holds against a balance that covers one
        let pool_a = pool.clone();
        let pool_b = pool.clone();
        let wallet_id = wallet.id;

        let hold = |pool: PgPool, reference: &'static str| async move {
            let mut tx = pool.begin().await.unwrap();
            let result = WalletService::hold_for_withdrawal_tx(
                &mut tx,
                wallet_id,
                Decimal::new(5_000, 2),
                reference,
                "hold",
                None,
            )
            .await;
            if result.is_ok() {
                tx.commit().await.unwrap();
            }
            result
        };

        let (first, second) = tokio::join!(hold(pool_a, "WD-a"), hold(pool_b, "WD-b"));

        assert!(
            first.is_ok() != second.is_ok(),
            "exactly one concurrent hold must succeed"
        );

        let wallet = wallets.get_wallet_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.pending_balance, usd(5_000));
    }
}
