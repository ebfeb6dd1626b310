//! SMS gateway interface and HTTP implementation

use axum::async_trait;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Successful delivery receipt from the SMS provider
#[derive(Debug, Clone)]
pub struct SmsDelivery {
    pub provider_message_id: String,
}

/// Narrow interface over the SMS/WhatsApp provider
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send a text message to an E.164 phone number
    async fn send(&self, phone: &str, message: &str) -> ApiResult<SmsDelivery>;
}

/// Reject anything that is not an E.164 number before dispatch
pub fn validate_e164(phone: &str) -> ApiResult<()> {
    let digits = match phone.strip_prefix('+') {
        Some(rest) => rest,
        None => {
            return Err(ApiError::ValidationError(format!(
                "Phone number '{}' is not E.164 (missing '+')",
                phone
            )))
        }
    };

    let valid_length = (8..=15).contains(&digits.len());
    let all_digits = digits.chars().all(|c| c.is_ascii_digit());
    let leading_nonzero = digits.starts_with(|c: char| ('1'..='9').contains(&c));

    if valid_length && all_digits && leading_nonzero {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!(
            "Phone number '{}' is not E.164",
            phone
        )))
    }
}

#[derive(Debug, Deserialize)]
struct SmsProviderResponse {
    message_id: Option<String>,
    status: Option<String>,
    error: Option<String>,
}

/// SMS gateway speaking a JSON-over-HTTP provider API
pub struct HttpSmsGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender_id: String,
}

impl HttpSmsGateway {
    pub fn new(endpoint: String, api_key: String, sender_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            sender_id,
        }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send(&self, phone: &str, message: &str) -> ApiResult<SmsDelivery> {
        validate_e164(phone)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.sender_id,
                "to": phone,
                "body": message,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: SmsProviderResponse = response.json().await.unwrap_or(SmsProviderResponse {
            message_id: None,
            status: None,
            error: None,
        });

        if !status.is_success() {
            return Err(ApiError::ProviderError(format!(
                "SMS provider returned {}: {}",
                status,
                body.error.unwrap_or_default()
            )));
        }

        if matches!(body.status.as_deref(), Some("failed") | Some("rejected")) {
            return Err(ApiError::ProviderError(format!(
                "SMS provider rejected message: {}",
                body.error.unwrap_or_default()
            )));
        }

        Ok(SmsDelivery {
            provider_message_id: body.message_id.unwrap_or_default(),
        })
    }
}
