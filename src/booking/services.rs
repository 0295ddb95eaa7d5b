//! Booking service functions with repository access.
//!
//! The write path for bookings and rooms. Every mutation of a booking's dates
//! or of a room's price reprices the affected bookings; the repository does
//! the final pricing under the room's lock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::AppCache;
use crate::db::HotelRepository;
use crate::models::{Amenity, Booking, BookingStatus, Photo, Role, Room, RoomType};

use super::calculators::{
    calculate_total, is_available, is_available_excluding, is_occupied, matches_search,
    recompute_price, DateRange, RoomSearch,
};

pub(crate) const CANCELLED_RESCHEDULE: &str = "Cancelled bookings cannot be rescheduled";

/// Booking and room validation errors
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Start date {start} must be before end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Room is already booked between {start} and {end}")]
    Overlap {
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Booking {booking_id} has no associated room")]
    MissingRoom { booking_id: Uuid },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Cannot change booking status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("You do not have permission to change this booking")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A shared cache load failed for every caller waiting on it
    #[error("Room catalogue unavailable: {0}")]
    Unavailable(String),
}

impl BookingError {
    /// Whether the user can fix the request and resubmit
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            BookingError::Database(_) | BookingError::Unavailable(_)
        )
    }
}

/// The acting user, as supplied by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn guest(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Guest,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn can_manage(&self, booking: &Booking) -> bool {
        self.is_admin() || booking.user_id == self.user_id
    }
}

/// Derived occupancy of a room on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Available,
    Occupied,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Available => f.write_str("available"),
            RoomStatus::Occupied => f.write_str("occupied"),
        }
    }
}

/// Result of a price quote
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteResult {
    pub room_id: Uuid,
    pub range: DateRange,
    pub nights: i64,
    pub nightly_price: Decimal,
    pub total: Decimal,
    pub available: bool,
}

/// Room fields editable by an administrator
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInput {
    pub room_number: String,
    pub room_type: RoomType,
    pub price: Decimal,
    pub description: Option<String>,
}

impl RoomInput {
    fn validate(&self) -> Result<(), BookingError> {
        if self.room_number.trim().is_empty() {
            return Err(BookingError::Validation(
                "Room number is required".to_string(),
            ));
        }
        if self.price <= Decimal::ZERO {
            return Err(BookingError::Validation(
                "Room price must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Create a pending booking for `[start, end)`.
///
/// Fails with `InvalidRange` for `start >= end`, `MissingRoom` when the room
/// does not exist, and `Overlap` when an active booking conflicts. The
/// repository re-checks the overlap and re-prices the stay under the room's
/// lock, so a concurrent booking or price change is never lost.
pub async fn create_booking(
    repo: &dyn HotelRepository,
    user_id: Uuid,
    room_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Booking, BookingError> {
    let range = DateRange::new(start, end)?;

    let room = repo.find_room(room_id).await?;
    let mut booking = Booking::pending(user_id, room_id, range);
    recompute_price(&mut booking, room.as_ref())?;

    let existing = repo.active_bookings(room_id).await?;
    if !is_available(&existing, &range) {
        return Err(BookingError::Overlap {
            room_id,
            start,
            end,
        });
    }

    let booking = repo.insert_booking(&booking).await?;

    info!(
        booking_id = %booking.id,
        room_id = %room_id,
        nights = range.nights(),
        total = %booking.total_price,
        "Booking created"
    );
    Ok(booking)
}

/// Move an active booking to new dates and reprice it
pub async fn reschedule_booking(
    repo: &dyn HotelRepository,
    actor: &Actor,
    booking_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Booking, BookingError> {
    let range = DateRange::new(start, end)?;
    let booking = load_booking(repo, booking_id).await?;

    if !actor.can_manage(&booking) {
        return Err(BookingError::Forbidden);
    }
    if !booking.is_active() {
        return Err(BookingError::Validation(CANCELLED_RESCHEDULE.to_string()));
    }

    let existing = repo.active_bookings(booking.room_id).await?;
    if !is_available_excluding(&existing, &range, booking.id) {
        return Err(BookingError::Overlap {
            room_id: booking.room_id,
            start,
            end,
        });
    }

    // Dates, price and the cancelled check are settled again by the repository
    let booking = repo.reschedule_booking(booking_id, &range).await?;

    info!(booking_id = %booking.id, total = %booking.total_price, "Booking rescheduled");
    Ok(booking)
}

/// Pending -> Confirmed
pub async fn confirm_booking(
    repo: &dyn HotelRepository,
    booking_id: Uuid,
) -> Result<Booking, BookingError> {
    let booking = load_booking(repo, booking_id).await?;
    let booking = transition(repo, &booking, BookingStatus::Confirmed).await?;

    info!(booking_id = %booking.id, "Booking confirmed");
    Ok(booking)
}

/// Pending | Confirmed -> Cancelled. The interval becomes bookable again.
pub async fn cancel_booking(
    repo: &dyn HotelRepository,
    actor: &Actor,
    booking_id: Uuid,
) -> Result<Booking, BookingError> {
    let booking = load_booking(repo, booking_id).await?;

    if !actor.can_manage(&booking) {
        warn!(booking_id = %booking_id, user_id = %actor.user_id, "Cancellation refused");
        return Err(BookingError::Forbidden);
    }

    let booking = transition(repo, &booking, BookingStatus::Cancelled).await?;

    info!(booking_id = %booking.id, "Booking cancelled");
    Ok(booking)
}

/// Apply a status change only if the stored status still allows it
async fn transition(
    repo: &dyn HotelRepository,
    booking: &Booking,
    next: BookingStatus,
) -> Result<Booking, BookingError> {
    if !booking.status.can_transition_to(next) {
        return Err(BookingError::InvalidTransition {
            from: booking.status,
            to: next,
        });
    }

    let from: Vec<BookingStatus> = BookingStatus::ALL
        .into_iter()
        .filter(|s| s.can_transition_to(next))
        .collect();
    repo.transition_booking(booking.id, &from, next).await
}

async fn load_booking(repo: &dyn HotelRepository, booking_id: Uuid) -> Result<Booking, BookingError> {
    repo.find_booking(booking_id)
        .await?
        .ok_or(BookingError::NotFound {
            entity: "Booking",
            id: booking_id,
        })
}

async fn load_room(repo: &dyn HotelRepository, room_id: Uuid) -> Result<Room, BookingError> {
    repo.find_room(room_id).await?.ok_or(BookingError::NotFound {
        entity: "Room",
        id: room_id,
    })
}

/// Rooms matching every given filter.
///
/// With a date range, rooms holding an active overlapping booking are
/// excluded regardless of the other filters.
pub async fn search_rooms(
    repo: &dyn HotelRepository,
    cache: &AppCache,
    search: &RoomSearch,
) -> Result<Vec<Room>, BookingError> {
    let rooms = cache.rooms(repo).await?;

    let booked: HashSet<Uuid> = match &search.range {
        Some(range) => repo.booked_room_ids(range).await?,
        None => HashSet::new(),
    };

    Ok(rooms
        .iter()
        .filter(|room| matches_search(room, search))
        .filter(|room| !booked.contains(&room.id))
        .cloned()
        .collect())
}

/// Every room paired with its occupancy on `day`
pub async fn room_statuses(
    repo: &dyn HotelRepository,
    cache: &AppCache,
    day: NaiveDate,
) -> Result<Vec<(Room, RoomStatus)>, BookingError> {
    let rooms = cache.rooms(repo).await?;
    let occupied = repo.booked_room_ids(&single_day(day)?).await?;

    Ok(rooms
        .iter()
        .map(|room| {
            let status = if occupied.contains(&room.id) {
                RoomStatus::Occupied
            } else {
                RoomStatus::Available
            };
            (room.clone(), status)
        })
        .collect())
}

/// Occupancy of one room on `day`
pub async fn room_status(
    repo: &dyn HotelRepository,
    room_id: Uuid,
    day: NaiveDate,
) -> Result<RoomStatus, BookingError> {
    load_room(repo, room_id).await?;
    let bookings = repo.active_bookings(room_id).await?;

    Ok(if is_occupied(&bookings, day) {
        RoomStatus::Occupied
    } else {
        RoomStatus::Available
    })
}

fn single_day(day: NaiveDate) -> Result<DateRange, BookingError> {
    let next = day
        .succ_opt()
        .ok_or_else(|| BookingError::Validation(format!("Date {} is out of range", day)))?;
    DateRange::new(day, next)
}

/// Price and availability for a prospective stay, without booking it
pub async fn quote(
    repo: &dyn HotelRepository,
    room_id: Uuid,
    range: DateRange,
) -> Result<QuoteResult, BookingError> {
    let room = load_room(repo, room_id).await?;
    let existing = repo.active_bookings(room_id).await?;

    Ok(QuoteResult {
        room_id,
        range,
        nights: range.nights(),
        nightly_price: room.price,
        total: calculate_total(room.price, &range),
        available: is_available(&existing, &range),
    })
}

/// Add a room to the catalogue
pub async fn add_room(
    repo: &dyn HotelRepository,
    cache: &AppCache,
    input: RoomInput,
) -> Result<Room, BookingError> {
    input.validate()?;

    let room = Room::new(
        input.room_number.trim(),
        input.room_type,
        input.price,
        input.description,
    );
    repo.insert_room(&room).await?;
    cache.invalidate_rooms().await;

    info!(room_id = %room.id, room_number = %room.room_number, "Room added");
    Ok(room)
}

/// Edit a room. Every active booking of the room is repriced in the same
/// unit of work; cancelled bookings keep their historical price.
pub async fn update_room(
    repo: &dyn HotelRepository,
    cache: &AppCache,
    room_id: Uuid,
    input: RoomInput,
) -> Result<Room, BookingError> {
    input.validate()?;

    let mut room = load_room(repo, room_id).await?;

    room.room_number = input.room_number.trim().to_string();
    room.room_type = input.room_type;
    room.price = input.price;
    room.description = input.description;

    let repriced = repo.update_room(&room).await?;
    cache.invalidate_rooms().await;

    info!(room_id = %room.id, repriced, "Room updated");
    Ok(room)
}

/// Register a new amenity name
pub async fn add_amenity(repo: &dyn HotelRepository, name: &str) -> Result<Amenity, BookingError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BookingError::Validation(
            "Amenity name is required".to_string(),
        ));
    }

    let amenity = Amenity {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    repo.insert_amenity(&amenity).await?;
    Ok(amenity)
}

pub async fn attach_amenity(
    repo: &dyn HotelRepository,
    cache: &AppCache,
    room_id: Uuid,
    amenity_id: Uuid,
) -> Result<(), BookingError> {
    load_room(repo, room_id).await?;
    repo.attach_amenity(room_id, amenity_id).await?;
    cache.invalidate_rooms().await;
    Ok(())
}

/// Record an already-stored photo path against a room
pub async fn add_photo(
    repo: &dyn HotelRepository,
    cache: &AppCache,
    room_id: Uuid,
    path: &str,
) -> Result<Photo, BookingError> {
    let path = path.trim();
    if path.is_empty() || path.split('/').any(|segment| segment == "..") {
        return Err(BookingError::Validation(format!(
            "Invalid photo path '{}'",
            path
        )));
    }

    load_room(repo, room_id).await?;
    let photo = Photo {
        id: Uuid::new_v4(),
        room_id,
        path: path.to_string(),
    };
    repo.insert_photo(&photo).await?;
    cache.invalidate_photos(room_id).await;
    Ok(photo)
}
