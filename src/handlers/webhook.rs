//! Payment-gateway webhook handlers
//!
//! Once a caller is authenticated, these endpoints always answer 2xx, since
//! a 5xx would trigger provider retry storms. Internal processing failures
//! are logged and pushed to the admin channel instead.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::handlers::ApiResponse;
use crate::payments::{PaymentFlow, PaymentWebhookPayload};
use crate::state::AppState;

/// Webhook for a booking's original online payment
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PaymentWebhookPayload>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    authenticate(&app_state, &headers)?;
    Ok(handle_payment(&app_state, PaymentFlow::BookingPayment, &provider, payload).await)
}

/// Webhook for a pay-on-arrival collection
pub async fn collection_webhook(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PaymentWebhookPayload>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    authenticate(&app_state, &headers)?;
    Ok(handle_payment(&app_state, PaymentFlow::ArrivalCollection, &provider, payload).await)
}

#[derive(Debug, Deserialize)]
pub struct PayoutWebhookPayload {
    /// Our withdrawal reference, echoed back by the provider
    pub reference: String,
    pub status: String,
}

/// Webhook for withdrawal payout completion or failure
pub async fn payout_webhook(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PayoutWebhookPayload>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    authenticate(&app_state, &headers)?;

    match app_state
        .withdrawal_service
        .handle_payout_result(&payload.reference, &payload.status)
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::ok(()))),
        Err(err) => {
            tracing::error!(
                provider = %provider,
                reference = %payload.reference,
                error = %err,
                "Payout webhook processing failed"
            );
            let notifier = app_state.notifier.clone();
            let detail = format!(
                "Payout webhook from {} for reference {} failed: {}",
                provider, payload.reference, err
            );
            tokio::spawn(async move {
                notifier.admin_alert("[webhooks] payout processing failure", &detail).await;
            });
            Ok(Json(ApiResponse::failure(err.to_string())))
        }
    }
}

async fn handle_payment(
    app_state: &AppState,
    flow: PaymentFlow,
    provider: &str,
    payload: PaymentWebhookPayload,
) -> Json<ApiResponse<()>> {
    match app_state
        .payment_service
        .handle_payment_event(flow, provider, &payload)
        .await
    {
        Ok(_) => Json(ApiResponse::ok(())),
        Err(err) => {
            tracing::error!(
                provider = %provider,
                reference = %payload.reference,
                error = %err,
                "Payment webhook processing failed"
            );
            let notifier = app_state.notifier.clone();
            let detail = format!(
                "Payment webhook from {} for reference {} failed: {}",
                provider, payload.reference, err
            );
            tokio::spawn(async move {
                notifier.admin_alert("[webhooks] payment processing failure", &detail).await;
            });
            Json(ApiResponse::failure(err.to_string()))
        }
    }
}

/// Shared-secret gate; fail-closed when no secret is configured
fn authenticate(
    app_state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ApiResponse<()>>)> {
    match &app_state.webhook_secret {
        Some(secret) if !secret.is_empty() => {
            let supplied = headers
                .get("X-Webhook-Secret")
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default();

            if supplied != secret {
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::failure(
                        "Unauthorized webhook request".to_string(),
                    )),
                ));
            }
            Ok(())
        }
        _ => {
            tracing::error!("Webhook secret not configured - rejecting request");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::failure(
                    "Webhook endpoint is not configured".to_string(),
                )),
            ))
        }
    }
}
