//! Display rows shared by the page templates

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::booking::RoomStatus;
use crate::models::{Booking, BookingStatus, Room};

pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

/// Room listing row
#[derive(Debug, Clone)]
pub struct RoomRow {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: String,
    pub price: String,
    /// Bare amount for the admin edit form
    pub price_amount: String,
    pub description: String,
    pub amenities: String,
    pub status: String,
}

impl RoomRow {
    pub fn new(room: &Room, status: RoomStatus, currency: &str) -> Self {
        Self {
            id: room.id,
            room_number: room.room_number.clone(),
            room_type: room.room_type.to_string(),
            price: format_money(room.price, currency),
            price_amount: room.price.to_string(),
            description: room.description_or_empty().to_string(),
            amenities: room.amenities_list(),
            status: status.to_string(),
        }
    }
}

/// Booking listing row
#[derive(Debug, Clone)]
pub struct BookingRow {
    pub id: Uuid,
    pub room_number: String,
    pub start_date: String,
    pub end_date: String,
    pub nights: i64,
    pub total_price: String,
    pub status: String,
    pub is_active: bool,
    pub can_confirm: bool,
}

impl BookingRow {
    pub fn new(booking: &Booking, rooms: &HashMap<Uuid, &Room>, currency: &str) -> Self {
        Self {
            id: booking.id,
            room_number: rooms
                .get(&booking.room_id)
                .map(|r| r.room_number.clone())
                .unwrap_or_else(|| "-".to_string()),
            start_date: booking.start_date.to_string(),
            end_date: booking.end_date.to_string(),
            nights: booking.nights(),
            total_price: format_money(booking.total_price, currency),
            status: booking.status.to_string(),
            is_active: booking.is_active(),
            can_confirm: booking.status == BookingStatus::Pending,
        }
    }
}

/// Index rooms by id for booking rows
pub fn rooms_by_id(rooms: &[Room]) -> HashMap<Uuid, &Room> {
    rooms.iter().map(|r| (r.id, r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money_two_places() {
        assert_eq!(format_money(dec!(200), "USD"), "200.00 USD");
        assert_eq!(format_money(dec!(89.5), "EUR"), "89.50 EUR");
    }
}
