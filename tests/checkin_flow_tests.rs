//! End-to-end check-in flow tests: lookup, code issuance, confirmation and
//! fund release

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::async_trait;
    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use uuid::Uuid;

    use tripvault_server::booking::BookingStore;
    use tripvault_server::checkin::{CheckInService, ConfirmRequest, CODE_ALPHABET, CODE_LENGTH};
    use tripvault_server::error::{ApiError, ApiResult};
    use tripvault_server::notify::{
        EmailGateway, NotificationService, SmsDelivery, SmsGateway,
    };
    use tripvault_server::payments::{PaymentFlow, PaymentService, PaymentWebhookPayload};
    use tripvault_server::user::UserStore;
    use tripvault_server::wallet::{ReleaseEngine, WalletService};

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsGateway for RecordingSms {
        async fn send(&self, phone: &str, message: &str) -> ApiResult<SmsDelivery> {
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            Ok(SmsDelivery {
                provider_message_id: "test".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingEmail {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmailGateway for RecordingEmail {
        async fn send(&self, to: &str, subject: &str, _html: &str, _text: &str) -> ApiResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/tripvault_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    struct Harness {
        checkin: CheckInService,
        wallets: WalletService,
        payments: PaymentService,
        sms: Arc<RecordingSms>,
    }

    fn harness(pool: PgPool) -> Harness {
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let users = UserStore::new(pool.clone());
        let bookings = BookingStore::new(pool.clone());
        let wallets = WalletService::new(pool.clone());
        let release = ReleaseEngine::new(wallets.clone());
        let notifier = Arc::new(NotificationService::new(
            sms.clone(),
            email,
            users,
            "ops@tripvault.test".to_string(),
            None,
        ));
        let payments = PaymentService::new(pool.clone(), wallets.clone(), bookings.clone());
        let checkin = CheckInService::new(bookings, payments.clone(), release, notifier);

        Harness {
            checkin,
            wallets,
            payments,
            sms,
        }
    }

    async fn seed_user(pool: &PgPool) -> Uuid {
        let user_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, phone, phone_verified, kyc_status)
            VALUES ($1, 'Test Host', $2, '+237670000001', TRUE, 'approved')
            "#,
        )
        .bind(user_id)
        .bind(format!("host-{}@example.test", user_id.simple()))
        .execute(pool)
        .await
        .expect("Failed to seed user");
        user_id
    }

    /// Seed an online-paid property booking for 100.00 USD
    async fn seed_booking(pool: &PgPool, host_id: Uuid) -> Uuid {
        let booking_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, kind, host_id, guest_name, guest_email, guest_phone,
                amount, currency, payment_mode
            )
            VALUES ($1, 'property', $2, 'Ama Guest', 'guest@example.test',
                    '+237670000099', 100.00, 'USD', 'online')
            "#,
        )
        .bind(booking_id)
        .bind(host_id)
        .execute(pool)
        .await
        .expect("Failed to seed booking");
        booking_id
    }

    /// Drive the payment webhook so the hold credit exists
    async fn complete_payment(harness: &Harness, booking_id: Uuid) {
        let payload = PaymentWebhookPayload {
            reference: format!("pay-{}", booking_id.simple()),
            booking_id: Some(booking_id),
            status: "SUCCESSFUL".to_string(),
            amount: Some(Decimal::new(10_000, 2)),
            currency: Some("USD".to_string()),
        };
        harness
            .payments
            .handle_payment_event(PaymentFlow::BookingPayment, "testpay", &payload)
            .await
            .expect("payment webhook failed");
    }

    async fn stored_code(pool: &PgPool, booking_id: Uuid) -> Option<String> {
        sqlx::query_scalar("SELECT booking_code FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_lookup_requires_completed_payment() {
        let pool = setup_test_db().await;
        let harness = harness(pool.clone());
        let host = seed_user(&pool).await;
        let booking = seed_booking(&pool, host).await;

        let result = harness.checkin.lookup(booking, host).await;
        assert!(matches!(result, Err(ApiError::PaymentNotCompleted(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_lookup_generates_code_once_and_sends_it() {
        let pool = setup_test_db().await;
        let harness = harness(pool.clone());
        let host = seed_user(&pool).await;
        let booking = seed_booking(&pool, host).await;
        complete_payment(&harness, booking).await;

        let first = harness.checkin.lookup(booking, host).await.unwrap();
        assert!(first.code_generated);

        let code = stored_code(&pool, booking).await.expect("code stored");
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));

        // The guest got the code over SMS
        let sent = harness.sms.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains(&code));

        // A second lookup neither regenerates nor re-sends
        let second = harness.checkin.lookup(booking, host).await.unwrap();
        assert!(!second.code_generated);
        assert_eq!(stored_code(&pool, booking).await.unwrap(), code);
        assert_eq!(harness.sms.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_stranger_cannot_look_up_or_confirm() {
        let pool = setup_test_db().await;
        let harness = harness(pool.clone());
        let host = seed_user(&pool).await;
        let stranger = seed_user(&pool).await;
        let booking = seed_booking(&pool, host).await;
        complete_payment(&harness, booking).await;

        let result = harness.checkin.lookup(booking, stranger).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));

        let result = harness
            .checkin
            .confirm(
                booking,
                ConfirmRequest {
                    staff_user_id: stranger,
                    code: "AAAAAA".to_string(),
                    instructions: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_confirm_releases_funds_exactly_once() {
        let pool = setup_test_db().await;
        let harness = harness(pool.clone());
        let host = seed_user(&pool).await;
        let booking = seed_booking(&pool, host).await;
        complete_payment(&harness, booking).await;

        harness.checkin.lookup(booking, host).await.unwrap();
        let code = stored_code(&pool, booking).await.unwrap();

        // Wrong code mutates nothing
        let wrong = harness
            .checkin
            .confirm(
                booking,
                ConfirmRequest {
                    staff_user_id: host,
                    code: "WRONG1".to_string(),
                    instructions: None,
                },
            )
            .await;
        assert!(matches!(wrong, Err(ApiError::InvalidCode)));

        // Scenario: 100.00 pending, 0.00 available before confirmation
        let wallet = harness.wallets.get_wallet_by_user(host).await.unwrap().unwrap();
        assert_eq!(wallet.pending_balance, Decimal::new(10_000, 2));
        assert_eq!(wallet.balance, Decimal::ZERO);

        let confirmation = harness
            .checkin
            .confirm(
                booking,
                ConfirmRequest {
                    staff_user_id: host,
                    code: code.clone(),
                    instructions: Some("Key is in the lockbox".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(confirmation.released.len(), 1);
        assert!(confirmation.released[0].released);
        assert_eq!(confirmation.released[0].amount, Decimal::new(10_000, 2));

        let wallet = harness.wallets.get_wallet_by_user(host).await.unwrap().unwrap();
        assert_eq!(wallet.pending_balance, Decimal::ZERO);
        assert_eq!(wallet.balance, Decimal::new(10_000, 2));

        // Exactly one release entry exists
        let entries = harness.wallets.entries_for(wallet.id, 100).await.unwrap();
        let releases: Vec<_> = entries
            .iter()
            .filter(|e| {
                e.entry_type == tripvault_server::wallet::LedgerEntryType::Release
            })
            .collect();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].amount, Decimal::new(10_000, 2));

        // Idempotence: a second confirmation is rejected and moves nothing
        let again = harness
            .checkin
            .confirm(
                booking,
                ConfirmRequest {
                    staff_user_id: host,
                    code,
                    instructions: None,
                },
            )
            .await;
        assert!(matches!(again, Err(ApiError::AlreadyCheckedIn)));

        let wallet = harness.wallets.get_wallet_by_user(host).await.unwrap().unwrap();
        assert_eq!(wallet.balance, Decimal::new(10_000, 2));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_checkout_requires_checkin_and_flips_once() {
        let pool = setup_test_db().await;
        let harness = harness(pool.clone());
        let host = seed_user(&pool).await;
        let booking = seed_booking(&pool, host).await;
        complete_payment(&harness, booking).await;

        // Before check-in
        let early = harness.checkin.confirm_check_out(booking, host).await;
        assert!(matches!(early, Err(ApiError::Conflict(_))));

        harness.checkin.lookup(booking, host).await.unwrap();
        let code = stored_code(&pool, booking).await.unwrap();
        harness
            .checkin
            .confirm(
                booking,
                ConfirmRequest {
                    staff_user_id: host,
                    code,
                    instructions: None,
                },
            )
            .await
            .unwrap();

        harness.checkin.confirm_check_out(booking, host).await.unwrap();

        let again = harness.checkin.confirm_check_out(booking, host).await;
        assert!(matches!(again, Err(ApiError::AlreadyCheckedOut)));
    }
}
