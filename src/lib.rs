//! Hotel room booking service.
//!
//! Rooms are booked over half-open `[start, end)` night ranges. Availability
//! is always derived from the active bookings, and the repository re-checks
//! overlaps at commit so concurrent requests cannot double-book a room.

pub mod booking;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;

use std::sync::Arc;

use cache::AppCache;
use config::Config;
use db::HotelRepository;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn HotelRepository>,
    pub cache: AppCache,
    pub config: Arc<Config>,
}
