//! Persistence port used by the booking services

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::booking::{BookingError, DateRange};
use crate::models::{Amenity, Booking, BookingStatus, Photo, Room, User};

/// Storage for rooms, bookings and users.
///
/// Booking writes never save a copy read earlier. Each one runs under the
/// room's lock and works on the stored row:
/// - `insert_booking` and `reschedule_booking` re-check overlap against the
///   other active bookings of the room and price the stay from the room's
///   current nightly price.
/// - `transition_booking` changes the status only if it is still one of the
///   expected ones.
/// - `update_room` rewrites only `total_price` of the room's active bookings.
#[async_trait]
pub trait HotelRepository: Send + Sync {
    /// All rooms with their amenity names, ordered by room number
    async fn list_rooms(&self) -> Result<Vec<Room>, BookingError>;

    async fn find_room(&self, room_id: Uuid) -> Result<Option<Room>, BookingError>;

    async fn insert_room(&self, room: &Room) -> Result<(), BookingError>;

    /// Save room fields and reprice its active bookings in one unit of work.
    /// Returns how many bookings were repriced.
    async fn update_room(&self, room: &Room) -> Result<u64, BookingError>;

    async fn list_amenities(&self) -> Result<Vec<Amenity>, BookingError>;

    async fn insert_amenity(&self, amenity: &Amenity) -> Result<(), BookingError>;

    async fn attach_amenity(&self, room_id: Uuid, amenity_id: Uuid) -> Result<(), BookingError>;

    async fn insert_photo(&self, photo: &Photo) -> Result<(), BookingError>;

    async fn photos_for_room(&self, room_id: Uuid) -> Result<Vec<Photo>, BookingError>;

    /// Non-cancelled bookings of a room, ordered by start date
    async fn active_bookings(&self, room_id: Uuid) -> Result<Vec<Booking>, BookingError>;

    /// Rooms holding an active booking that overlaps `range`
    async fn booked_room_ids(&self, range: &DateRange) -> Result<HashSet<Uuid>, BookingError>;

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError>;

    /// Bookings of a user, ordered by start date
    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError>;

    /// Every booking, ordered by start date
    async fn list_bookings(&self) -> Result<Vec<Booking>, BookingError>;

    /// Store a new booking. Fails with `MissingRoom` or `Overlap`; returns the
    /// booking as stored, priced at the room's current rate.
    async fn insert_booking(&self, booking: &Booking) -> Result<Booking, BookingError>;

    /// Move a non-cancelled booking to `range` and reprice it
    async fn reschedule_booking(
        &self,
        booking_id: Uuid,
        range: &DateRange,
    ) -> Result<Booking, BookingError>;

    /// Set the status to `to` if it is currently one of `from`; otherwise
    /// `InvalidTransition` from the status actually stored
    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Booking, BookingError>;

    async fn list_users(&self) -> Result<Vec<User>, BookingError>;
}
