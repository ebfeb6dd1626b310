//! API handlers
//!
//! Thin wrappers over the domain services; errors surface through
//! [`ApiError`](crate::error::ApiError)'s response mapping.

mod checkin;
mod wallet;
mod webhook;
mod withdrawal;

pub use checkin::*;
pub use wallet::*;
pub use webhook::*;
pub use withdrawal::*;

use serde::Serialize;

/// Generic API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}
