//! Request DTOs for booking forms and queries.
//!
//! HTML forms submit empty strings for untouched fields; those are treated as
//! absent filters.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::RoomType;

use super::calculators::{DateRange, RoomSearch};
use super::services::{BookingError, RoomInput};

/// Booking and reschedule form: `YYYY-MM-DD` dates
#[derive(Debug, Default, Deserialize)]
pub struct DatesForm {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

impl DatesForm {
    pub fn range(&self) -> Result<DateRange, BookingError> {
        DateRange::parse(&self.start_date, &self.end_date)
    }
}

/// Room search query
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchQuery {
    /// The date filter applies only when both dates are given
    pub fn to_search(&self) -> Result<RoomSearch, BookingError> {
        let room_type = non_blank(&self.room_type)
            .map(|t| t.parse::<RoomType>().map_err(BookingError::Validation))
            .transpose()?;

        let range = match (non_blank(&self.start_date), non_blank(&self.end_date)) {
            (Some(start), Some(end)) => Some(DateRange::parse(start, end)?),
            _ => None,
        };

        Ok(RoomSearch {
            room_type,
            range,
            text: non_blank(&self.q).map(str::to_string),
        })
    }
}

/// Admin add/edit room form
#[derive(Debug, Deserialize)]
pub struct RoomForm {
    pub room_number: String,
    pub room_type: String,
    pub price: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RoomForm {
    pub fn to_input(&self) -> Result<RoomInput, BookingError> {
        let room_type = self
            .room_type
            .parse::<RoomType>()
            .map_err(BookingError::Validation)?;
        let price = self
            .price
            .trim()
            .parse::<Decimal>()
            .map_err(|_| BookingError::Validation(format!("Invalid price '{}'", self.price)))?;

        Ok(RoomInput {
            room_number: self.room_number.clone(),
            room_type,
            price,
            description: non_blank(&self.description).map(str::to_string),
        })
    }
}

/// Admin add amenity form
#[derive(Debug, Deserialize)]
pub struct AmenityForm {
    pub name: String,
}

/// Admin attach amenity form
#[derive(Debug, Deserialize)]
pub struct AttachAmenityForm {
    pub amenity_id: Uuid,
}

/// Admin add photo form; the file itself is stored by the upload layer
#[derive(Debug, Deserialize)]
pub struct PhotoForm {
    pub path: String,
}
