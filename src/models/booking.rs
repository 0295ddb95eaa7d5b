//! Booking model and status lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::booking::calculators::DateRange;

/// Booking status, stored as the `booking_status` Postgres enum.
///
/// `Pending -> Confirmed`, `Pending | Confirmed -> Cancelled`. Cancelled is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];

    /// Whether the booking still holds its interval
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking from the `bookings` table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// New pending booking. The price stays zero until `recompute_price` runs.
    pub fn pending(user_id: Uuid, room_id: Uuid, range: DateRange) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            start_date: range.start(),
            end_date: range.end(),
            total_price: Decimal::ZERO,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Half-open overlap against `[start, end)`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date < end && start < self.end_date
    }

    /// Whether `day` falls inside `[start_date, end_date)`
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day < self.end_date
    }

    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}
