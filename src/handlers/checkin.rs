//! Check-in API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::checkin::{
    CheckInConfirmation, CheckInLookup, CheckOutConfirmation, CheckOutRequest, ConfirmRequest,
    LookupRequest,
};
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::state::AppState;

/// Phase 1: booking lookup and lazy code issuance
pub async fn checkin_lookup(
    State(app_state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<LookupRequest>,
) -> ApiResult<Json<ApiResponse<CheckInLookup>>> {
    let lookup = app_state
        .checkin_service
        .lookup(booking_id, body.staff_user_id)
        .await?;

    Ok(Json(ApiResponse::ok(lookup)))
}

/// Phase 2: code confirmation and fund release
pub async fn checkin_confirm(
    State(app_state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ConfirmRequest>,
) -> ApiResult<Json<ApiResponse<CheckInConfirmation>>> {
    let confirmation = app_state.checkin_service.confirm(booking_id, body).await?;

    Ok(Json(ApiResponse::ok(confirmation)))
}

/// Check-out confirmation; no fund movement
pub async fn checkout_confirm(
    State(app_state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CheckOutRequest>,
) -> ApiResult<Json<ApiResponse<CheckOutConfirmation>>> {
    let confirmation = app_state
        .checkin_service
        .confirm_check_out(booking_id, body.staff_user_id)
        .await?;

    Ok(Json(ApiResponse::ok(confirmation)))
}
