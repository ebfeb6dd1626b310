//! Check-in route definitions

use axum::{routing::post, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn checkin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/check-in/:booking_id/lookup", post(checkin_lookup))
        .route("/api/check-in/:booking_id/confirm", post(checkin_confirm))
        .route("/api/check-in/:booking_id/check-out", post(checkout_confirm))
}
