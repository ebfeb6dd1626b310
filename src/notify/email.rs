//! Email gateway interface and HTTP implementation

use axum::async_trait;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Narrow interface over the transactional email provider
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send an email with both HTML and plain-text bodies
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> ApiResult<()>;
}

#[derive(Debug, Deserialize)]
struct EmailProviderResponse {
    error: Option<String>,
}

/// Email gateway speaking a JSON-over-HTTP provider API
pub struct HttpEmailGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpEmailGateway {
    pub fn new(endpoint: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailGateway for HttpEmailGateway {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> ApiResult<()> {
        if to.is_empty() || !to.contains('@') {
            return Err(ApiError::ValidationError(format!(
                "Invalid recipient address '{}'",
                to
            )));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: EmailProviderResponse = response
                .json()
                .await
                .unwrap_or(EmailProviderResponse { error: None });
            return Err(ApiError::ProviderError(format!(
                "Email provider returned {}: {}",
                status,
                body.error.unwrap_or_default()
            )));
        }

        Ok(())
    }
}
