//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::checkin::CheckInService;
use crate::notify::NotificationService;
use crate::payments::PaymentService;
use crate::user::UserStore;
use crate::wallet::WalletService;
use crate::withdrawal::WithdrawalService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub wallet_service: WalletService,
    pub checkin_service: Arc<CheckInService>,
    pub withdrawal_service: Arc<WithdrawalService>,
    pub payment_service: PaymentService,
    pub user_store: UserStore,
    pub notifier: Arc<NotificationService>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(
        wallet_service: WalletService,
        checkin_service: Arc<CheckInService>,
        withdrawal_service: Arc<WithdrawalService>,
        payment_service: PaymentService,
        user_store: UserStore,
        notifier: Arc<NotificationService>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            wallet_service,
            checkin_service,
            withdrawal_service,
            payment_service,
            user_store,
            notifier,
            webhook_secret,
        }
    }
}

impl FromRef<AppState> for WalletService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.wallet_service.clone()
    }
}

impl FromRef<AppState> for Arc<CheckInService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.checkin_service.clone()
    }
}

impl FromRef<AppState> for Arc<WithdrawalService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.withdrawal_service.clone()
    }
}

impl FromRef<AppState> for PaymentService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<NotificationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifier.clone()
    }
}
