//! Booking engine module.
//!
//! Decides whether a date range may be booked for a room, prices stays, and
//! drives the booking lifecycle through the repository port.

pub mod calculators;
pub mod requests;
pub mod responses;
pub mod services;

// Re-export commonly used items
pub use calculators::{DateRange, RoomSearch};
pub use services::{Actor, BookingError, QuoteResult, RoomInput, RoomStatus};
