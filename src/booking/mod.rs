//! Booking domain module
//!
//! One polymorphic booking type covers both the property-stay and guided-tour
//! domains; the check-in record and beneficiary split live on the booking.

mod model;
mod store;

pub use model::*;
pub use store::{BookingStore, CodeAssignment};
