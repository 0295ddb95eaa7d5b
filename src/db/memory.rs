//! In-memory repository, used by tests and local demos

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::booking::calculators::recompute_price;
use crate::booking::services::CANCELLED_RESCHEDULE;
use crate::booking::{BookingError, DateRange};
use crate::models::{Amenity, Booking, BookingStatus, Photo, Room, User};

use super::repository::HotelRepository;

#[derive(Default)]
struct State {
    rooms: HashMap<Uuid, Room>,
    amenities: HashMap<Uuid, Amenity>,
    room_amenities: HashSet<(Uuid, Uuid)>,
    photos: Vec<Photo>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

impl State {
    fn conflicts(&self, booking: &Booking) -> bool {
        self.bookings.values().any(|other| {
            other.id != booking.id
                && other.room_id == booking.room_id
                && other.is_active()
                && other.overlaps(booking.start_date, booking.end_date)
        })
    }

    /// Amenity names of a room, sorted like the Postgres aggregate
    fn amenity_names(&self, room_id: Uuid) -> Vec<String> {
        let mut names: Vec<String> = self
            .room_amenities
            .iter()
            .filter(|(r, _)| *r == room_id)
            .filter_map(|(_, a)| self.amenities.get(a).map(|a| a.name.clone()))
            .collect();
        names.sort();
        names
    }

    fn room_with_amenities(&self, room: &Room) -> Room {
        Room {
            amenities: self.amenity_names(room.id),
            ..room.clone()
        }
    }

    fn sorted_bookings<'a>(&self, iter: impl Iterator<Item = &'a Booking>) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = iter.cloned().collect();
        bookings.sort_by_key(|b| (b.start_date, b.created_at));
        bookings
    }
}

fn overlap(booking: &Booking) -> BookingError {
    BookingError::Overlap {
        room_id: booking.room_id,
        start: booking.start_date,
        end: booking.end_date,
    }
}

/// Repository holding everything behind a single lock.
///
/// Overlap re-checks and writes happen under the same write guard.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user; user management belongs to the auth layer
    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl HotelRepository for InMemoryRepository {
    async fn list_rooms(&self) -> Result<Vec<Room>, BookingError> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .map(|r| state.room_with_amenities(r))
            .collect();
        rooms.sort_by(|a, b| a.room_number.cmp(&b.room_number));
        Ok(rooms)
    }

    async fn find_room(&self, room_id: Uuid) -> Result<Option<Room>, BookingError> {
        let state = self.state.read().await;
        Ok(state.rooms.get(&room_id).map(|r| state.room_with_amenities(r)))
    }

    async fn insert_room(&self, room: &Room) -> Result<(), BookingError> {
        self.state.write().await.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn update_room(&self, room: &Room) -> Result<u64, BookingError> {
        let mut guard = self.state.write().await;
        let State {
            rooms, bookings, ..
        } = &mut *guard;

        if !rooms.contains_key(&room.id) {
            return Err(BookingError::NotFound {
                entity: "Room",
                id: room.id,
            });
        }
        rooms.insert(room.id, room.clone());

        let mut repriced = 0;
        for booking in bookings
            .values_mut()
            .filter(|b| b.room_id == room.id && b.is_active())
        {
            recompute_price(booking, Some(room))?;
            repriced += 1;
        }
        Ok(repriced)
    }

    async fn list_amenities(&self) -> Result<Vec<Amenity>, BookingError> {
        let state = self.state.read().await;
        let mut amenities: Vec<Amenity> = state.amenities.values().cloned().collect();
        amenities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(amenities)
    }

    async fn insert_amenity(&self, amenity: &Amenity) -> Result<(), BookingError> {
        let mut state = self.state.write().await;
        if state.amenities.values().any(|a| a.name == amenity.name) {
            return Err(BookingError::Validation(format!(
                "Amenity '{}' already exists",
                amenity.name
            )));
        }
        state.amenities.insert(amenity.id, amenity.clone());
        Ok(())
    }

    async fn attach_amenity(&self, room_id: Uuid, amenity_id: Uuid) -> Result<(), BookingError> {
        let mut state = self.state.write().await;
        if !state.amenities.contains_key(&amenity_id) {
            return Err(BookingError::NotFound {
                entity: "Amenity",
                id: amenity_id,
            });
        }
        state.room_amenities.insert((room_id, amenity_id));
        Ok(())
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<(), BookingError> {
        self.state.write().await.photos.push(photo.clone());
        Ok(())
    }

    async fn photos_for_room(&self, room_id: Uuid) -> Result<Vec<Photo>, BookingError> {
        let state = self.state.read().await;
        let mut photos: Vec<Photo> = state
            .photos
            .iter()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(photos)
    }

    async fn active_bookings(&self, room_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        let state = self.state.read().await;
        Ok(state.sorted_bookings(
            state
                .bookings
                .values()
                .filter(|b| b.room_id == room_id && b.is_active()),
        ))
    }

    async fn booked_room_ids(&self, range: &DateRange) -> Result<HashSet<Uuid>, BookingError> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.is_active() && b.overlaps(range.start(), range.end()))
            .map(|b| b.room_id)
            .collect())
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        Ok(self.state.read().await.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        let state = self.state.read().await;
        Ok(state.sorted_bookings(state.bookings.values().filter(|b| b.user_id == user_id)))
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, BookingError> {
        let state = self.state.read().await;
        Ok(state.sorted_bookings(state.bookings.values()))
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let mut state = self.state.write().await;

        let room = state.rooms.get(&booking.room_id).ok_or(BookingError::MissingRoom {
            booking_id: booking.id,
        })?;
        let mut stored = booking.clone();
        recompute_price(&mut stored, Some(room))?;

        if stored.is_active() && state.conflicts(&stored) {
            return Err(overlap(&stored));
        }

        state.bookings.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn reschedule_booking(
        &self,
        booking_id: Uuid,
        range: &DateRange,
    ) -> Result<Booking, BookingError> {
        let mut state = self.state.write().await;

        let current = state.bookings.get(&booking_id).ok_or(BookingError::NotFound {
            entity: "Booking",
            id: booking_id,
        })?;
        if !current.is_active() {
            return Err(BookingError::Validation(CANCELLED_RESCHEDULE.to_string()));
        }

        let mut moved = Booking {
            start_date: range.start(),
            end_date: range.end(),
            ..current.clone()
        };
        if state.conflicts(&moved) {
            return Err(overlap(&moved));
        }
        let room_id = moved.room_id;
        recompute_price(&mut moved, state.rooms.get(&room_id))?;

        state.bookings.insert(moved.id, moved.clone());
        Ok(moved)
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let mut state = self.state.write().await;

        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound {
                entity: "Booking",
                id: booking_id,
            })?;
        if !from.contains(&booking.status) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to,
            });
        }

        booking.status = to;
        Ok(booking.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, BookingError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}
