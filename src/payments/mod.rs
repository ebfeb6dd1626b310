//! Payment records and payment-gateway webhook processing
//!
//! Providers disagree on status vocabularies, so every inbound status goes
//! through one normalization step before it can drive fund movements.

mod model;
mod service;

pub use model::*;
pub use service::PaymentService;
