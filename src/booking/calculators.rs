//! Core availability and pricing functions.
//!
//! Pure functions over rooms and their bookings - no database access.
//! All date ranges are half-open: `[start, end)`, the checkout day is never
//! occupied and never charged.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::models::{Booking, Room, RoomType};

use super::services::BookingError;

/// Wire format for dates coming from forms and query strings
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated half-open date range with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start >= end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` strings into a range
    pub fn parse(start: &str, end: &str) -> Result<Self, BookingError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whole nights between check-in and checkout
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// `[a, b)` and `[c, d)` overlap iff `a < d && c < b`
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Parse a single `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| BookingError::InvalidDate {
        value: value.to_string(),
    })
}

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Total price for staying `range` at `nightly_price`
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
/// use hotel_booking::booking::calculators::{calculate_total, DateRange};
///
/// let range = DateRange::new(
///     NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
/// )
/// .unwrap();
/// assert_eq!(calculate_total(dec!(100), &range), dec!(200));
/// ```
pub fn calculate_total(nightly_price: Decimal, range: &DateRange) -> Decimal {
    round_money(nightly_price * Decimal::from(range.nights()), 2)
}

/// Refresh `booking.total_price` from its dates and its room's nightly price.
///
/// Must run after any change to the booking's dates, its room, or the room's
/// price. Running it twice gives the same result.
pub fn recompute_price(booking: &mut Booking, room: Option<&Room>) -> Result<Decimal, BookingError> {
    let room = room
        .filter(|r| r.id == booking.room_id)
        .ok_or(BookingError::MissingRoom {
            booking_id: booking.id,
        })?;

    let range = DateRange::new(booking.start_date, booking.end_date)?;
    booking.total_price = calculate_total(room.price, &range);
    Ok(booking.total_price)
}

/// True iff no active booking overlaps `range`
pub fn is_available(bookings: &[Booking], range: &DateRange) -> bool {
    !bookings
        .iter()
        .any(|b| b.is_active() && b.overlaps(range.start(), range.end()))
}

/// Like `is_available`, ignoring the booking being edited
pub fn is_available_excluding(bookings: &[Booking], range: &DateRange, exclude: uuid::Uuid) -> bool {
    !bookings
        .iter()
        .any(|b| b.id != exclude && b.is_active() && b.overlaps(range.start(), range.end()))
}

/// True iff some active booking covers `day`
pub fn is_occupied(bookings: &[Booking], day: NaiveDate) -> bool {
    bookings.iter().any(|b| b.is_active() && b.covers(day))
}

/// Room search criteria, combined with AND. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSearch {
    pub room_type: Option<RoomType>,
    pub range: Option<DateRange>,
    pub text: Option<String>,
}

/// Static filters only (type and text); the date filter needs bookings.
pub fn matches_search(room: &Room, search: &RoomSearch) -> bool {
    if let Some(room_type) = search.room_type {
        if room.room_type != room_type {
            return false;
        }
    }

    match search.text.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            room.room_number.to_lowercase().contains(&needle)
                || room.description_or_empty().to_lowercase().contains(&needle)
                || room
                    .amenities
                    .iter()
                    .any(|a| a.to_lowercase().contains(&needle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn jan(start: u32, end: u32) -> DateRange {
        DateRange::new(date(2024, 1, start), date(2024, 1, end)).unwrap()
    }

    fn booking_on(room: &Room, range: DateRange, status: BookingStatus) -> Booking {
        let mut booking = Booking::pending(Uuid::new_v4(), room.id, range);
        booking.status = status;
        booking
    }

    fn room(number: &str, room_type: RoomType, price: Decimal) -> Room {
        Room::new(number, room_type, price, Some("Sea view with balcony".to_string()))
    }

    // ==================== DateRange tests ====================

    #[test]
    fn test_date_range_rejects_empty_and_inverted() {
        let err = DateRange::new(date(2024, 1, 10), date(2024, 1, 10)).unwrap_err();
        assert!(matches!(err, BookingError::InvalidRange { .. }));

        let err = DateRange::new(date(2024, 1, 12), date(2024, 1, 10)).unwrap_err();
        assert!(matches!(err, BookingError::InvalidRange { .. }));
    }

    #[test]
    fn test_date_range_parse() {
        let range = DateRange::parse("2024-01-10", " 2024-01-12 ").unwrap();
        assert_eq!(range.start(), date(2024, 1, 10));
        assert_eq!(range.nights(), 2);

        let err = DateRange::parse("01/10/2024", "2024-01-12").unwrap_err();
        assert!(matches!(err, BookingError::InvalidDate { ref value } if value == "01/10/2024"));
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        assert!(!jan(10, 15).overlaps(&jan(15, 20)));
        assert!(!jan(15, 20).overlaps(&jan(10, 15)));
        assert!(jan(10, 15).overlaps(&jan(14, 16)));
        assert!(jan(10, 15).overlaps(&jan(1, 31)));
    }

    #[test]
    fn test_nights_across_month_boundary() {
        let range = DateRange::new(date(2024, 1, 30), date(2024, 2, 2)).unwrap();
        assert_eq!(range.nights(), 3);
        // 2024 is a leap year
        let range = DateRange::new(date(2024, 2, 28), date(2024, 3, 1)).unwrap();
        assert_eq!(range.nights(), 2);
    }

    // ==================== pricing tests ====================

    #[test]
    fn test_calculate_total_two_nights() {
        assert_eq!(calculate_total(dec!(100), &jan(10, 12)), dec!(200));
    }

    #[test]
    fn test_calculate_total_fractional_price() {
        assert_eq!(calculate_total(dec!(89.99), &jan(10, 13)), dec!(269.97));
    }

    #[test]
    fn test_recompute_price_is_idempotent() {
        let room = room("101", RoomType::Single, dec!(100));
        let mut booking = booking_on(&room, jan(10, 12), BookingStatus::Pending);

        assert_eq!(recompute_price(&mut booking, Some(&room)).unwrap(), dec!(200));
        assert_eq!(recompute_price(&mut booking, Some(&room)).unwrap(), dec!(200));
        assert_eq!(booking.total_price, dec!(200));
    }

    #[test]
    fn test_recompute_price_follows_dates_and_room_price() {
        let mut room = room("101", RoomType::Single, dec!(100));
        let mut booking = booking_on(&room, jan(10, 12), BookingStatus::Pending);
        recompute_price(&mut booking, Some(&room)).unwrap();

        booking.end_date = date(2024, 1, 15);
        recompute_price(&mut booking, Some(&room)).unwrap();
        assert_eq!(booking.total_price, dec!(500));

        room.price = dec!(120);
        recompute_price(&mut booking, Some(&room)).unwrap();
        assert_eq!(booking.total_price, dec!(600));
    }

    #[test]
    fn test_recompute_price_without_room() {
        let room = room("101", RoomType::Single, dec!(100));
        let mut booking = booking_on(&room, jan(10, 12), BookingStatus::Pending);

        let err = recompute_price(&mut booking, None).unwrap_err();
        assert!(matches!(err, BookingError::MissingRoom { booking_id } if booking_id == booking.id));

        let other = Room::new("202", RoomType::Double, dec!(150), None);
        let err = recompute_price(&mut booking, Some(&other)).unwrap_err();
        assert!(matches!(err, BookingError::MissingRoom { .. }));
        assert_eq!(booking.total_price, Decimal::ZERO);
    }

    // ==================== availability tests ====================

    #[test]
    fn test_is_available_around_existing_booking() {
        let room = room("101", RoomType::Single, dec!(100));
        let bookings = vec![booking_on(&room, jan(10, 15), BookingStatus::Confirmed)];

        assert!(!is_available(&bookings, &jan(12, 14)));
        assert!(is_available(&bookings, &jan(15, 20)));
        assert!(is_available(&bookings, &jan(5, 10)));
        assert!(!is_available(&bookings, &jan(5, 11)));
        assert!(!is_available(&bookings, &jan(1, 31)));
    }

    #[test]
    fn test_is_available_is_idempotent() {
        let room = room("101", RoomType::Single, dec!(100));
        let bookings = vec![booking_on(&room, jan(10, 15), BookingStatus::Pending)];

        let first = is_available(&bookings, &jan(12, 14));
        for _ in 0..5 {
            assert_eq!(is_available(&bookings, &jan(12, 14)), first);
        }
    }

    #[test]
    fn test_cancelled_bookings_free_the_interval() {
        let room = room("101", RoomType::Single, dec!(100));
        let mut bookings = vec![booking_on(&room, jan(10, 15), BookingStatus::Pending)];
        assert!(!is_available(&bookings, &jan(10, 15)));

        bookings[0].status = BookingStatus::Cancelled;
        assert!(is_available(&bookings, &jan(10, 15)));
        assert!(!is_occupied(&bookings, date(2024, 1, 12)));
    }

    #[test]
    fn test_is_available_excluding_self() {
        let room = room("101", RoomType::Single, dec!(100));
        let bookings = vec![booking_on(&room, jan(10, 15), BookingStatus::Pending)];
        let own_id = bookings[0].id;

        assert!(is_available_excluding(&bookings, &jan(11, 16), own_id));
        assert!(!is_available_excluding(&bookings, &jan(11, 16), Uuid::new_v4()));
    }

    #[test]
    fn test_is_occupied() {
        let room = room("101", RoomType::Single, dec!(100));
        let bookings = vec![booking_on(&room, jan(10, 15), BookingStatus::Confirmed)];

        assert!(is_occupied(&bookings, date(2024, 1, 10)));
        assert!(is_occupied(&bookings, date(2024, 1, 14)));
        assert!(!is_occupied(&bookings, date(2024, 1, 15)));
        assert!(!is_occupied(&[], date(2024, 1, 12)));
    }

    // ==================== search tests ====================

    #[test]
    fn test_matches_search_type_and_text() {
        let mut single = room("101", RoomType::Single, dec!(80));
        single.amenities = vec!["Minibar".to_string()];
        let double = Room::new("202", RoomType::Double, dec!(120), None);

        let by_type = RoomSearch {
            room_type: Some(RoomType::Double),
            ..Default::default()
        };
        assert!(!matches_search(&single, &by_type));
        assert!(matches_search(&double, &by_type));

        let by_text = RoomSearch {
            text: Some("SEA VIEW".to_string()),
            ..Default::default()
        };
        assert!(matches_search(&single, &by_text));
        assert!(!matches_search(&double, &by_text));

        let by_amenity = RoomSearch {
            text: Some("minib".to_string()),
            ..Default::default()
        };
        assert!(matches_search(&single, &by_amenity));

        let both = RoomSearch {
            room_type: Some(RoomType::Double),
            text: Some("sea".to_string()),
            range: None,
        };
        assert!(!matches_search(&single, &both));
        assert!(!matches_search(&double, &both));
    }

    #[test]
    fn test_matches_search_blank_text_matches_all() {
        let double = Room::new("202", RoomType::Double, dec!(120), None);
        let search = RoomSearch {
            text: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches_search(&double, &search));
        assert!(matches_search(&double, &RoomSearch::default()));
    }
}
