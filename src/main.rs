//! TripVault Backend Server
//!
//! Marketplace funds core: wallet ledger, check-in verification gating fund
//! release, and the OTP-authorized withdrawal lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use tripvault_server::booking::BookingStore;
use tripvault_server::checkin::CheckInService;
use tripvault_server::config::Config;
use tripvault_server::db;
use tripvault_server::middleware::{self, RateLimiter};
use tripvault_server::notify::{HttpEmailGateway, HttpSmsGateway, NotificationService};
use tripvault_server::otp::{session_purger, OtpAuthority};
use tripvault_server::payments::PaymentService;
use tripvault_server::state::AppState;
use tripvault_server::user::UserStore;
use tripvault_server::wallet::{ReleaseEngine, WalletService};
use tripvault_server::withdrawal::{
    withdrawal_expiry_sweeper, ApprovalPolicy, AutoApprove, ManualApproval, WithdrawalService,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting TripVault server");

    // Database pool, migrations and connectivity check
    let db_pool = match db::init(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database setup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Outbound gateways
    let sms_gateway = Arc::new(HttpSmsGateway::new(
        config.sms_gateway_url.clone(),
        config.sms_gateway_api_key.clone(),
        config.sms_sender_id.clone(),
    ));
    let email_gateway = Arc::new(HttpEmailGateway::new(
        config.email_gateway_url.clone(),
        config.email_gateway_api_key.clone(),
        config.email_from.clone(),
    ));

    // Stores and services
    let user_store = UserStore::new(db_pool.clone());
    let booking_store = BookingStore::new(db_pool.clone());
    let wallet_service = WalletService::new(db_pool.clone());
    let release_engine = ReleaseEngine::new(wallet_service.clone());

    let notifier = Arc::new(NotificationService::new(
        sms_gateway.clone(),
        email_gateway,
        user_store.clone(),
        config.admin_email.clone(),
        config.admin_phone.clone(),
    ));

    let payment_service = PaymentService::new(
        db_pool.clone(),
        wallet_service.clone(),
        booking_store.clone(),
    );

    let checkin_service = Arc::new(CheckInService::new(
        booking_store.clone(),
        payment_service.clone(),
        release_engine,
        notifier.clone(),
    ));

    let otp_authority = Arc::new(OtpAuthority::new(
        sms_gateway,
        config.otp_ttl_seconds,
        config.otp_resend_interval_seconds,
    ));

    let approval_policy: Arc<dyn ApprovalPolicy> = if config.withdrawal_auto_approve {
        Arc::new(AutoApprove {
            max_amount: Some(config.high_value_threshold),
        })
    } else {
        Arc::new(ManualApproval)
    };

    let withdrawal_service = Arc::new(WithdrawalService::new(
        db_pool.clone(),
        wallet_service.clone(),
        user_store.clone(),
        otp_authority.clone(),
        notifier.clone(),
        approval_policy,
        config.high_value_threshold,
        config.withdrawal_expiry_hours,
    ));

    let app_state = AppState::new(
        wallet_service,
        checkin_service,
        withdrawal_service.clone(),
        payment_service,
        user_store,
        notifier,
        config.webhook_secret.clone(),
    );

    // Background tasks
    tokio::spawn(async move {
        withdrawal_expiry_sweeper(withdrawal_service).await;
        tracing::error!("Withdrawal expiry sweeper exited unexpectedly");
    });

    tokio::spawn(async move {
        session_purger(otp_authority).await;
        tracing::error!("OTP session purger exited unexpectedly");
    });

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        middleware::rate_limiter_cleanup(cleanup_limiter).await;
    });

    // Health check pool handle
    let health_db_pool = db_pool.clone();

    // App router
    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_db_pool.clone())))
        .merge(tripvault_server::routes::checkin_routes())
        .merge(tripvault_server::routes::wallet_routes())
        .merge(tripvault_server::routes::withdrawal_routes())
        .merge(tripvault_server::routes::webhook_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            middleware::rate_limit_layer(limiter)(req, next)
        }))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Could not bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

async fn root() -> &'static str {
    "TripVault API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
