//! Booking models and data structures

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Booking domain discriminator as stored in the database
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingDomain {
    Property,
    Tour,
}

/// How the guest pays for the booking
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Online,
    OnArrival,
}

/// The parties behind a booking, by domain
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BookingKind {
    Property {
        host_id: Uuid,
        agent_id: Option<Uuid>,
    },
    Tour {
        guide_id: Uuid,
    },
}

impl BookingKind {
    pub fn label(&self) -> &'static str {
        match self {
            BookingKind::Property { .. } => "stay",
            BookingKind::Tour { .. } => "tour",
        }
    }
}

/// Role a beneficiary plays in the booking's fund split
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BeneficiaryRole {
    Host,
    Agent,
    Guide,
}

/// One party entitled to a share of the booking's funds
#[derive(Debug, Clone, Serialize)]
pub struct Beneficiary {
    pub user_id: Uuid,
    pub role: BeneficiaryRole,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// Check-in verification state attached to a booking
#[derive(Debug, Clone, Serialize)]
pub struct CheckInRecord {
    pub booking_code: Option<String>,
    pub check_in_validated: bool,
    pub check_in_validated_at: Option<DateTime<Utc>>,
    pub check_in_validated_by: Option<Uuid>,
    pub check_out_validated: bool,
    pub check_out_validated_at: Option<DateTime<Utc>>,
}

/// A booking in either domain
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub kind: BookingKind,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub payment_mode: PaymentMode,
    pub host_amount: Option<Decimal>,
    pub agent_amount: Option<Decimal>,
    pub guide_amount: Option<Decimal>,
    pub check_in: CheckInRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The parties whose wallets receive a share of the booking's funds
    ///
    /// The host (or guide) takes the whole amount unless an explicit split is
    /// recorded on the booking.
    pub fn beneficiaries(&self) -> Vec<Beneficiary> {
        match &self.kind {
            BookingKind::Property { host_id, agent_id } => {
                let mut parties = vec![Beneficiary {
                    user_id: *host_id,
                    role: BeneficiaryRole::Host,
                    amount: self.host_amount.unwrap_or(self.amount),
                }];
                if let (Some(agent_id), Some(agent_amount)) = (agent_id, self.agent_amount) {
                    parties.push(Beneficiary {
                        user_id: *agent_id,
                        role: BeneficiaryRole::Agent,
                        amount: agent_amount,
                    });
                }
                parties
            }
            BookingKind::Tour { guide_id } => vec![Beneficiary {
                user_id: *guide_id,
                role: BeneficiaryRole::Guide,
                amount: self.guide_amount.unwrap_or(self.amount),
            }],
        }
    }

    /// Whether a staff user is a party to this booking (host/agent/guide)
    pub fn is_party(&self, staff_user_id: Uuid) -> bool {
        match &self.kind {
            BookingKind::Property { host_id, agent_id } => {
                *host_id == staff_user_id || *agent_id == Some(staff_user_id)
            }
            BookingKind::Tour { guide_id } => *guide_id == staff_user_id,
        }
    }
}

/// Raw database row; converted into [`Booking`] after kind resolution
#[derive(Debug, sqlx::FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub kind: BookingDomain,
    pub host_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub guide_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_mode: PaymentMode,
    pub host_amount: Option<Decimal>,
    pub agent_amount: Option<Decimal>,
    pub guide_amount: Option<Decimal>,
    pub booking_code: Option<String>,
    pub check_in_validated: bool,
    pub check_in_validated_at: Option<DateTime<Utc>>,
    pub check_in_validated_by: Option<Uuid>,
    pub check_out_validated: bool,
    pub check_out_validated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = ApiError;

    fn try_from(row: BookingRow) -> ApiResult<Self> {
        let kind = match row.kind {
            BookingDomain::Property => BookingKind::Property {
                host_id: row.host_id.ok_or_else(|| {
                    ApiError::InternalError(format!("Property booking {} has no host", row.id))
                })?,
                agent_id: row.agent_id,
            },
            BookingDomain::Tour => BookingKind::Tour {
                guide_id: row.guide_id.ok_or_else(|| {
                    ApiError::InternalError(format!("Tour booking {} has no guide", row.id))
                })?,
            },
        };

        Ok(Booking {
            id: row.id,
            kind,
            guest_name: row.guest_name,
            guest_email: row.guest_email,
            guest_phone: row.guest_phone,
            amount: row.amount,
            currency: row.currency,
            payment_mode: row.payment_mode,
            host_amount: row.host_amount,
            agent_amount: row.agent_amount,
            guide_amount: row.guide_amount,
            check_in: CheckInRecord {
                booking_code: row.booking_code,
                check_in_validated: row.check_in_validated,
                check_in_validated_at: row.check_in_validated_at,
                check_in_validated_by: row.check_in_validated_by,
                check_out_validated: row.check_out_validated,
                check_out_validated_at: row.check_out_validated_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
