//! Withdrawal request models and state machine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::validate_e164;

/// Withdrawal request lifecycle status
///
/// ```text
/// PENDING -> APPROVED -> PROCESSING -> COMPLETED
/// PENDING -> REJECTED                  (refund)
/// PROCESSING -> FAILED                 (refund)
/// APPROVED -> EXPIRED (24h idle)       (refund)
/// PENDING | APPROVED -> CANCELLED      (refund)
/// ```
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "withdrawal_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processing,
    Completed,
    Rejected,
    Failed,
    Expired,
    Cancelled,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed
                | WithdrawalStatus::Rejected
                | WithdrawalStatus::Failed
                | WithdrawalStatus::Expired
                | WithdrawalStatus::Cancelled
        )
    }

    /// Terminal states that hand the held amount back to the wallet
    pub fn requires_refund(&self) -> bool {
        self.is_terminal() && *self != WithdrawalStatus::Completed
    }

    /// Whether the state machine permits this edge
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Processing)
                | (Approved, Expired)
                | (Approved, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Expired => "expired",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }
}

/// Payout channel
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "withdrawal_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMethod {
    MobileMoney,
    OrangeMoney,
    Bank,
}

/// Structured payout target
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayoutDestination {
    MobileMoney { msisdn: String },
    Bank {
        account_name: String,
        account_number: String,
        bank_code: String,
    },
}

impl PayoutDestination {
    /// Validate the destination against the chosen method
    pub fn validate(&self, method: WithdrawalMethod) -> ApiResult<()> {
        match (self, method) {
            (
                PayoutDestination::MobileMoney { msisdn },
                WithdrawalMethod::MobileMoney | WithdrawalMethod::OrangeMoney,
            ) => validate_e164(msisdn),
            (
                PayoutDestination::Bank {
                    account_name,
                    account_number,
                    bank_code,
                },
                WithdrawalMethod::Bank,
            ) => {
                if account_name.trim().is_empty()
                    || account_number.trim().is_empty()
                    || bank_code.trim().is_empty()
                {
                    return Err(ApiError::ValidationError(
                        "Bank destination requires account name, number and bank code".to_string(),
                    ));
                }
                Ok(())
            }
            _ => Err(ApiError::ValidationError(
                "Payout destination does not match the withdrawal method".to_string(),
            )),
        }
    }
}

/// A user's withdrawal request
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub method: WithdrawalMethod,
    pub destination: Json<PayoutDestination>,
    pub reference: String,
    pub status: WithdrawalStatus,
    pub failure_reason: Option<String>,
    pub linked_payout_method_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Request DTO for creating a withdrawal
#[derive(Debug, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub method: WithdrawalMethod,
    pub destination: PayoutDestination,
    /// One-time passcode previously issued for this exact amount
    pub otp: String,
    pub linked_payout_method_id: Option<Uuid>,
}

impl CreateWithdrawalRequest {
    /// Validate request shape before touching any state
    pub fn validate(&self) -> ApiResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(ApiError::ValidationError(
                "Amount must be greater than 0".to_string(),
            ));
        }
        if self.currency.len() != 3 {
            return Err(ApiError::ValidationError(
                "Currency must be a 3-letter code".to_string(),
            ));
        }
        if self.otp.len() != 6 || !self.otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::ValidationError(
                "One-time code must be 6 digits".to_string(),
            ));
        }
        self.destination.validate(self.method)
    }
}

/// Request DTO for issuing a withdrawal OTP
#[derive(Debug, Deserialize)]
pub struct RequestOtpBody {
    pub user_id: Uuid,
    pub phone: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

/// Receipt returned after OTP issuance; the code itself never leaves the
/// delivery channels
#[derive(Debug, Serialize)]
pub struct OtpIssueReceipt {
    pub expires_at: DateTime<Utc>,
    pub channel: &'static str,
}

/// Query parameters for listing withdrawals
#[derive(Debug, Deserialize)]
pub struct ListWithdrawalsQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<WithdrawalStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(WithdrawalStatus::Completed.is_terminal());
        assert!(WithdrawalStatus::Rejected.is_terminal());
        assert!(WithdrawalStatus::Failed.is_terminal());
        assert!(WithdrawalStatus::Expired.is_terminal());
        assert!(WithdrawalStatus::Cancelled.is_terminal());
        assert!(!WithdrawalStatus::Pending.is_terminal());
        assert!(!WithdrawalStatus::Approved.is_terminal());
        assert!(!WithdrawalStatus::Processing.is_terminal());
    }

    #[test]
    fn test_every_terminal_state_except_completed_refunds() {
        assert!(!WithdrawalStatus::Completed.requires_refund());
        assert!(WithdrawalStatus::Rejected.requires_refund());
        assert!(WithdrawalStatus::Failed.requires_refund());
        assert!(WithdrawalStatus::Expired.requires_refund());
        assert!(WithdrawalStatus::Cancelled.requires_refund());
        assert!(!WithdrawalStatus::Pending.requires_refund());
    }

    #[test]
    fn test_transition_table() {
        use WithdrawalStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Processing));
        assert!(Approved.can_transition_to(Expired));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        // No edges out of terminal states, no skipping stages
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Completed));
    }

    #[test]
    fn test_mobile_destination_requires_e164() {
        let destination = PayoutDestination::MobileMoney {
            msisdn: "0670000001".to_string(),
        };
        assert!(destination.validate(WithdrawalMethod::MobileMoney).is_err());

        let destination = PayoutDestination::MobileMoney {
            msisdn: "+237670000001".to_string(),
        };
        assert!(destination.validate(WithdrawalMethod::MobileMoney).is_ok());
        assert!(destination.validate(WithdrawalMethod::OrangeMoney).is_ok());
        assert!(destination.validate(WithdrawalMethod::Bank).is_err());
    }

    #[test]
    fn test_bank_destination_requires_all_fields() {
        let destination = PayoutDestination::Bank {
            account_name: "Jordan Doe".to_string(),
            account_number: "".to_string(),
            bank_code: "TVB".to_string(),
        };
        assert!(destination.validate(WithdrawalMethod::Bank).is_err());

        let destination = PayoutDestination::Bank {
            account_name: "Jordan Doe".to_string(),
            account_number: "0001112223".to_string(),
            bank_code: "TVB".to_string(),
        };
        assert!(destination.validate(WithdrawalMethod::Bank).is_ok());
    }

    #[test]
    fn test_create_request_validation() {
        let mut request = CreateWithdrawalRequest {
            user_id: Uuid::new_v4(),
            amount: Decimal::new(5_000, 2),
            currency: "USD".to_string(),
            method: WithdrawalMethod::MobileMoney,
            destination: PayoutDestination::MobileMoney {
                msisdn: "+237670000001".to_string(),
            },
            otp: "123456".to_string(),
            linked_payout_method_id: None,
        };
        assert!(request.validate().is_ok());

        request.amount = Decimal::ZERO;
        assert!(request.validate().is_err());

        request.amount = Decimal::new(5_000, 2);
        request.otp = "12345".to_string();
        assert!(request.validate().is_err());

        request.otp = "12345a".to_string();
        assert!(request.validate().is_err());
    }
}
