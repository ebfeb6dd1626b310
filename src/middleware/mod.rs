//! Middleware for the TripVault API
//!
//! Request tracing, token-bucket rate limiting and security headers.

mod rate_limiter;
mod security;
mod tracing;

pub use rate_limiter::{rate_limit_layer, rate_limiter_cleanup, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use tracing::request_tracing;
