//! Postgres-backed repository

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::booking::calculators::calculate_total;
use crate::booking::services::CANCELLED_RESCHEDULE;
use crate::booking::{BookingError, DateRange};
use crate::models::{Amenity, Booking, BookingStatus, Photo, Room, User};

use super::queries;
use super::repository::HotelRepository;

/// SQLSTATE for `exclusion_violation`, raised by `bookings_no_overlap`
const EXCLUSION_VIOLATION: &str = "23P01";
/// SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Repository over a Postgres connection pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply pending migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, BookingError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| BookingError::Database(e.into()))?;

        Ok(Self::new(pool))
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn overlap(booking: &Booking) -> BookingError {
    BookingError::Overlap {
        room_id: booking.room_id,
        start: booking.start_date,
        end: booking.end_date,
    }
}

/// Map the exclusion constraint backstop onto `Overlap`
fn overlap_or_database(err: sqlx::Error, booking: &Booking) -> BookingError {
    match sqlstate(&err).as_deref() {
        Some(EXCLUSION_VIOLATION) => {
            warn!(booking_id = %booking.id, "Overlap caught by exclusion constraint");
            overlap(booking)
        }
        // The room row is locked, so only the user reference can be dangling
        Some(FOREIGN_KEY_VIOLATION) => {
            BookingError::Validation(format!("Unknown user {}", booking.user_id))
        }
        _ => BookingError::Database(err),
    }
}

#[async_trait]
impl HotelRepository for PgRepository {
    async fn list_rooms(&self) -> Result<Vec<Room>, BookingError> {
        Ok(queries::list_rooms(&self.pool).await?)
    }

    async fn find_room(&self, room_id: Uuid) -> Result<Option<Room>, BookingError> {
        Ok(queries::find_room(&self.pool, room_id).await?)
    }

    async fn insert_room(&self, room: &Room) -> Result<(), BookingError> {
        Ok(queries::insert_room(&self.pool, room).await?)
    }

    async fn update_room(&self, room: &Room) -> Result<u64, BookingError> {
        let mut tx = self.pool.begin().await?;

        if queries::lock_room(&mut *tx, room.id).await?.is_none() {
            return Err(BookingError::NotFound {
                entity: "Room",
                id: room.id,
            });
        }
        queries::update_room(&mut *tx, room).await?;
        let repriced = queries::reprice_active_bookings(&mut *tx, room.id, room.price).await?;

        tx.commit().await?;
        Ok(repriced)
    }

    async fn list_amenities(&self) -> Result<Vec<Amenity>, BookingError> {
        Ok(queries::list_amenities(&self.pool).await?)
    }

    async fn insert_amenity(&self, amenity: &Amenity) -> Result<(), BookingError> {
        queries::insert_amenity(&self.pool, amenity)
            .await
            .map_err(|e| {
                if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                    BookingError::Validation(format!("Amenity '{}' already exists", amenity.name))
                } else {
                    BookingError::Database(e)
                }
            })
    }

    async fn attach_amenity(&self, room_id: Uuid, amenity_id: Uuid) -> Result<(), BookingError> {
        queries::attach_amenity(&self.pool, room_id, amenity_id)
            .await
            .map_err(|e| {
                if sqlstate(&e).as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                    BookingError::NotFound {
                        entity: "Amenity",
                        id: amenity_id,
                    }
                } else {
                    BookingError::Database(e)
                }
            })
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<(), BookingError> {
        Ok(queries::insert_photo(&self.pool, photo).await?)
    }

    async fn photos_for_room(&self, room_id: Uuid) -> Result<Vec<Photo>, BookingError> {
        Ok(queries::photos_for_room(&self.pool, room_id).await?)
    }

    async fn active_bookings(&self, room_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        Ok(queries::active_bookings(&self.pool, room_id).await?)
    }

    async fn booked_room_ids(&self, range: &DateRange) -> Result<HashSet<Uuid>, BookingError> {
        let ids = queries::booked_room_ids(&self.pool, range.start(), range.end()).await?;
        Ok(ids.into_iter().collect())
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        Ok(queries::find_booking(&self.pool, booking_id).await?)
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        Ok(queries::bookings_for_user(&self.pool, user_id).await?)
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(queries::list_bookings(&self.pool).await?)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let price = queries::lock_room(&mut *tx, booking.room_id)
            .await?
            .ok_or(BookingError::MissingRoom {
                booking_id: booking.id,
            })?;

        let conflicts = queries::count_overlapping(
            &mut *tx,
            booking.room_id,
            booking.start_date,
            booking.end_date,
            None,
        )
        .await?;
        if conflicts > 0 {
            return Err(overlap(booking));
        }

        // Priced under the lock, so a concurrent price change cannot be missed
        let range = DateRange::new(booking.start_date, booking.end_date)?;
        let stored = Booking {
            total_price: calculate_total(price, &range),
            ..booking.clone()
        };

        queries::insert_booking(&mut *tx, &stored)
            .await
            .map_err(|e| overlap_or_database(e, &stored))?;
        tx.commit()
            .await
            .map_err(|e| overlap_or_database(e, &stored))?;

        Ok(stored)
    }

    async fn reschedule_booking(
        &self,
        booking_id: Uuid,
        range: &DateRange,
    ) -> Result<Booking, BookingError> {
        let current = queries::find_booking(&self.pool, booking_id)
            .await?
            .ok_or(BookingError::NotFound {
                entity: "Booking",
                id: booking_id,
            })?;

        let mut tx = self.pool.begin().await?;

        let price = queries::lock_room(&mut *tx, current.room_id)
            .await?
            .ok_or(BookingError::MissingRoom { booking_id })?;

        let moved = Booking {
            start_date: range.start(),
            end_date: range.end(),
            total_price: calculate_total(price, range),
            ..current
        };

        let conflicts = queries::count_overlapping(
            &mut *tx,
            moved.room_id,
            moved.start_date,
            moved.end_date,
            Some(booking_id),
        )
        .await?;
        if conflicts > 0 {
            return Err(overlap(&moved));
        }

        let stored = queries::reschedule_booking(
            &mut *tx,
            booking_id,
            moved.start_date,
            moved.end_date,
            moved.total_price,
        )
        .await
        .map_err(|e| overlap_or_database(e, &moved))?
        .ok_or_else(|| BookingError::Validation(CANCELLED_RESCHEDULE.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| overlap_or_database(e, &moved))?;
        Ok(stored)
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        if let Some(booking) = queries::transition_booking(&self.pool, booking_id, from, to).await? {
            return Ok(booking);
        }

        // Nothing matched: report what is actually stored
        match queries::find_booking(&self.pool, booking_id).await? {
            Some(current) => Err(BookingError::InvalidTransition {
                from: current.status,
                to,
            }),
            None => Err(BookingError::NotFound {
                entity: "Booking",
                id: booking_id,
            }),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, BookingError> {
        Ok(queries::list_users(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    // The database tests below need a Postgres server: run them with
    // `DATABASE_URL=... cargo test -- --ignored`. Each one gets a fresh
    // database with the migrations applied.

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn pending(user_id: Uuid, room_id: Uuid, start: &str, end: &str) -> Booking {
        Booking::pending(user_id, room_id, DateRange::parse(start, end).unwrap())
    }

    async fn seed(pool: &PgPool) -> (PgRepository, Room, Uuid) {
        let repo = PgRepository::new(pool.clone());
        let room = Room::new("101", RoomType::Single, dec!(100), None);
        repo.insert_room(&room).await.unwrap();

        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, username, email) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(format!("guest-{}", user_id))
            .bind(format!("{}@example.com", user_id))
            .execute(pool)
            .await
            .unwrap();

        (repo, room, user_id)
    }

    #[test]
    fn test_non_database_errors_are_not_overlaps() {
        let booking = pending(Uuid::new_v4(), Uuid::new_v4(), "2024-01-10", "2024-01-12");

        let err = overlap_or_database(sqlx::Error::RowNotFound, &booking);
        assert!(matches!(err, BookingError::Database(sqlx::Error::RowNotFound)));
        assert_eq!(sqlstate(&sqlx::Error::PoolTimedOut), None);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_overlap_rejected_and_touching_accepted(pool: PgPool) {
        let (repo, room, user_id) = seed(&pool).await;

        let first = repo
            .insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();
        assert_eq!(first.total_price, dec!(500));

        let err = repo
            .insert_booking(&pending(user_id, room.id, "2024-01-12", "2024-01-14"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Overlap { .. }));

        repo.insert_booking(&pending(user_id, room.id, "2024-01-15", "2024-01-20"))
            .await
            .unwrap();
        repo.insert_booking(&pending(user_id, room.id, "2024-01-05", "2024-01-10"))
            .await
            .unwrap();
        assert_eq!(repo.active_bookings(room.id).await.unwrap().len(), 3);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_count_overlapping_is_half_open(pool: PgPool) {
        let (repo, room, user_id) = seed(&pool).await;
        let booking = repo
            .insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();

        let count = |start: &'static str, end: &'static str, exclude: Option<Uuid>| {
            queries::count_overlapping(&pool, room.id, date(start), date(end), exclude)
        };
        assert_eq!(count("2024-01-12", "2024-01-14", None).await.unwrap(), 1);
        assert_eq!(count("2024-01-14", "2024-01-16", None).await.unwrap(), 1);
        assert_eq!(count("2024-01-15", "2024-01-20", None).await.unwrap(), 0);
        assert_eq!(count("2024-01-05", "2024-01-10", None).await.unwrap(), 0);
        assert_eq!(count("2024-01-12", "2024-01-14", Some(booking.id)).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_exclusion_constraint_maps_to_overlap(pool: PgPool) {
        let (repo, room, user_id) = seed(&pool).await;
        repo.insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();

        // Skip the transactional check and hit the constraint directly
        let clash = pending(user_id, room.id, "2024-01-14", "2024-01-16");
        let err = queries::insert_booking(&pool, &clash).await.unwrap_err();
        assert_eq!(sqlstate(&err).as_deref(), Some(EXCLUSION_VIOLATION));
        assert!(matches!(
            overlap_or_database(err, &clash),
            BookingError::Overlap { .. }
        ));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_cancelled_interval_is_rebookable(pool: PgPool) {
        let (repo, room, user_id) = seed(&pool).await;
        let booking = repo
            .insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();

        let cancelled = repo
            .transition_booking(booking.id, &[BookingStatus::Pending], BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        repo.insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();

        let err = repo
            .transition_booking(booking.id, &[BookingStatus::Pending], BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed
            }
        ));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_reschedule_rechecks_and_reprices(pool: PgPool) {
        let (repo, room, user_id) = seed(&pool).await;
        let first = repo
            .insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-12"))
            .await
            .unwrap();
        repo.insert_booking(&pending(user_id, room.id, "2024-01-20", "2024-01-22"))
            .await
            .unwrap();

        let moved = repo
            .reschedule_booking(first.id, &DateRange::parse("2024-01-11", "2024-01-15").unwrap())
            .await
            .unwrap();
        assert_eq!(moved.total_price, dec!(400));

        let err = repo
            .reschedule_booking(first.id, &DateRange::parse("2024-01-19", "2024-01-21").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Overlap { .. }));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_update_room_reprices_active_only(pool: PgPool) {
        let (repo, mut room, user_id) = seed(&pool).await;
        let active = repo
            .insert_booking(&pending(user_id, room.id, "2024-01-10", "2024-01-12"))
            .await
            .unwrap();
        let cancelled = repo
            .insert_booking(&pending(user_id, room.id, "2024-02-01", "2024-02-03"))
            .await
            .unwrap();
        repo.transition_booking(cancelled.id, &[BookingStatus::Pending], BookingStatus::Cancelled)
            .await
            .unwrap();

        room.price = dec!(150);
        assert_eq!(repo.update_room(&room).await.unwrap(), 1);

        let active = repo.find_booking(active.id).await.unwrap().unwrap();
        assert_eq!(active.total_price, dec!(300));
        assert_eq!(active.status, BookingStatus::Pending);
        let cancelled = repo.find_booking(cancelled.id).await.unwrap().unwrap();
        assert_eq!(cancelled.total_price, dec!(200));
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_foreign_key_violations(pool: PgPool) {
        let (repo, room, _user_id) = seed(&pool).await;

        let err = repo
            .insert_booking(&pending(Uuid::new_v4(), room.id, "2024-01-10", "2024-01-12"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));

        let err = repo.attach_amenity(room.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: "Amenity", .. }));
    }
}
