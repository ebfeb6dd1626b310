//! Check-in verification domain
//!
//! Two-phase protocol: a lookup that authorizes the staff member and lazily
//! issues the guest's verification code, and a confirmation that compares
//! the code and triggers the fund release.

mod code;
mod model;
mod service;

pub use code::{generate_booking_code, CODE_ALPHABET, CODE_LENGTH};
pub use model::*;
pub use service::CheckInService;
