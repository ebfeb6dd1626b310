//! Wallet API handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::state::AppState;
use crate::wallet::{LedgerEntry, WalletResponse};

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}

/// Get a user's wallet balances
pub async fn get_wallet(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WalletResponse>>> {
    let wallet = app_state
        .wallet_service
        .get_wallet_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No wallet for user {}", user_id)))?;

    Ok(Json(ApiResponse::ok(wallet.into())))
}

/// Deactivate a user's wallet (wallets are never deleted)
pub async fn deactivate_wallet(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let wallet = app_state
        .wallet_service
        .get_wallet_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No wallet for user {}", user_id)))?;

    app_state.wallet_service.deactivate(wallet.id).await?;

    Ok(Json(ApiResponse::ok(())))
}

/// Get a user's ledger history, newest first
pub async fn get_wallet_transactions(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Json<ApiResponse<Vec<LedgerEntry>>>> {
    let wallet = app_state
        .wallet_service
        .get_wallet_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No wallet for user {}", user_id)))?;

    let entries = app_state
        .wallet_service
        .entries_for(wallet.id, query.limit.unwrap_or(50))
        .await?;

    Ok(Json(ApiResponse::ok(entries)))
}
