//! Wallet route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wallets/:user_id", get(get_wallet))
        .route(
            "/api/wallets/:user_id/transactions",
            get(get_wallet_transactions),
        )
        .route("/api/wallets/:user_id/deactivate", post(deactivate_wallet))
}
