//! Webhook route definitions

use axum::{routing::post, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/api/webhooks/payments/:provider", post(payment_webhook))
        .route(
            "/api/webhooks/collections/:provider",
            post(collection_webhook),
        )
        .route("/api/webhooks/payouts/:provider", post(payout_webhook))
}
