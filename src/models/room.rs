//! Room, amenity and photo models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Room category, stored as the `room_type` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "room_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomType {
    Single,
    Double,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Single => "SINGLE",
            RoomType::Double => "DOUBLE",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both `SINGLE` and legacy mixed-case values such as `Single`.
impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(RoomType::Single),
            "DOUBLE" => Ok(RoomType::Double),
            other => Err(format!("unknown room type '{}'", other)),
        }
    }
}

/// Room row joined with its amenity names
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub description: Option<String>,
    pub amenities: Vec<String>,
}

impl Room {
    pub fn new(
        room_number: impl Into<String>,
        room_type: RoomType,
        price: Decimal,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_number: room_number.into(),
            room_type,
            price,
            description,
            amenities: Vec::new(),
        }
    }

    /// Amenity names as a comma-separated string, for listings
    pub fn amenities_list(&self) -> String {
        self.amenities.join(", ")
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Amenity from the `amenities` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Amenity {
    pub id: Uuid,
    pub name: String,
}

/// Photo path attached to a room
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Photo {
    pub id: Uuid,
    pub room_id: Uuid,
    pub path: String,
}
