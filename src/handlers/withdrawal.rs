//! Withdrawal API handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::state::AppState;
use crate::withdrawal::{
    CreateWithdrawalRequest, ListWithdrawalsQuery, OtpIssueReceipt, RequestOtpBody,
    WithdrawalRequest,
};

/// Issue a withdrawal OTP (SMS first, email fallback)
pub async fn request_withdrawal_otp(
    State(app_state): State<AppState>,
    Json(body): Json<RequestOtpBody>,
) -> ApiResult<Json<ApiResponse<OtpIssueReceipt>>> {
    let receipt = app_state.withdrawal_service.request_otp(body).await?;

    Ok(Json(ApiResponse::ok(receipt)))
}

/// Create a withdrawal request
pub async fn create_withdrawal(
    State(app_state): State<AppState>,
    Json(body): Json<CreateWithdrawalRequest>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let request = app_state.withdrawal_service.request_withdrawal(body).await?;

    Ok(Json(ApiResponse::ok(request)))
}

/// Get a withdrawal request by id
pub async fn get_withdrawal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let request = app_state.withdrawal_service.get(id).await?;

    Ok(Json(ApiResponse::ok(request)))
}

/// List withdrawal requests with filtering and pagination
pub async fn list_withdrawals(
    State(app_state): State<AppState>,
    Query(query): Query<ListWithdrawalsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<WithdrawalRequest>>>> {
    let requests = app_state.withdrawal_service.list(query).await?;

    Ok(Json(ApiResponse::ok(requests)))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub user_id: Uuid,
}

/// Approve a pending withdrawal (admin action)
pub async fn approve_withdrawal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let request = app_state.withdrawal_service.approve(id).await?;

    Ok(Json(ApiResponse::ok(request)))
}

/// Reject a pending withdrawal; the held amount is refunded
pub async fn reject_withdrawal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectBody>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let request = app_state.withdrawal_service.reject(id, &body.reason).await?;

    Ok(Json(ApiResponse::ok(request)))
}

/// Cancel a withdrawal on behalf of its owner
pub async fn cancel_withdrawal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelBody>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let request = app_state
        .withdrawal_service
        .cancel(id, body.user_id)
        .await?;

    Ok(Json(ApiResponse::ok(request)))
}

/// Hand an approved withdrawal to the payout provider
pub async fn process_withdrawal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let request = app_state.withdrawal_service.start_processing(id).await?;

    Ok(Json(ApiResponse::ok(request)))
}
