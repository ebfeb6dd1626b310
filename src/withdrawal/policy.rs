//! Injectable approval policy for new withdrawal requests

use rust_decimal::Decimal;

use crate::withdrawal::WithdrawalRequest;

/// Decides whether a freshly created request skips manual review
pub trait ApprovalPolicy: Send + Sync {
    fn auto_approve(&self, request: &WithdrawalRequest) -> bool;
}

/// Every request waits for an administrator
pub struct ManualApproval;

impl ApprovalPolicy for ManualApproval {
    fn auto_approve(&self, _request: &WithdrawalRequest) -> bool {
        false
    }
}

/// Requests are approved on creation, optionally capped by amount
pub struct AutoApprove {
    pub max_amount: Option<Decimal>,
}

impl ApprovalPolicy for AutoApprove {
    fn auto_approve(&self, request: &WithdrawalRequest) -> bool {
        match self.max_amount {
            Some(cap) => request.amount <= cap,
            None => true,
        }
    }
}
