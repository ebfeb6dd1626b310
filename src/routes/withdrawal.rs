//! Withdrawal route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn withdrawal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/withdrawals", post(create_withdrawal))
        .route("/api/withdrawals", get(list_withdrawals))
        .route("/api/withdrawals/otp", post(request_withdrawal_otp))
        .route("/api/withdrawals/:id", get(get_withdrawal))
        .route("/api/withdrawals/:id/approve", post(approve_withdrawal))
        .route("/api/withdrawals/:id/reject", post(reject_withdrawal))
        .route("/api/withdrawals/:id/cancel", post(cancel_withdrawal))
        .route("/api/withdrawals/:id/process", post(process_withdrawal))
}
