//! Database queries for rooms, bookings and users
//!
//! Every function takes any Postgres executor so it can run against the pool
//! or inside an open transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Amenity, Booking, BookingStatus, Photo, Room, User};

const ROOM_SELECT: &str = r#"
    SELECT
        r.id,
        r.room_number,
        r.room_type,
        r.price,
        r.description,
        COALESCE(
            array_agg(a.name::text ORDER BY a.name) FILTER (WHERE a.id IS NOT NULL),
            '{}'::text[]
        ) AS amenities
    FROM rooms r
    LEFT JOIN room_amenities ra ON ra.room_id = r.id
    LEFT JOIN amenities a ON a.id = ra.amenity_id
"#;

const BOOKING_COLUMNS: &str = r#"
    id, user_id, room_id, start_date, end_date, total_price, status, created_at
"#;

/// Get all rooms with their amenities
pub async fn list_rooms<'e, E: PgExecutor<'e>>(executor: E) -> sqlx::Result<Vec<Room>> {
    let sql = format!("{} GROUP BY r.id ORDER BY r.room_number", ROOM_SELECT);
    sqlx::query_as::<_, Room>(&sql).fetch_all(executor).await
}

/// Get a room by id
pub async fn find_room<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
) -> sqlx::Result<Option<Room>> {
    let sql = format!("{} WHERE r.id = $1 GROUP BY r.id", ROOM_SELECT);
    sqlx::query_as::<_, Room>(&sql)
        .bind(room_id)
        .fetch_optional(executor)
        .await
}

/// Lock the room row for the rest of the transaction and read its price.
///
/// Serializes concurrent booking writes and price changes for the same room.
pub async fn lock_room<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
) -> sqlx::Result<Option<Decimal>> {
    sqlx::query_scalar(
        r#"
        SELECT price FROM rooms WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(room_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_room<'e, E: PgExecutor<'e>>(executor: E, room: &Room) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rooms (id, room_number, room_type, price, description)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(room.id)
    .bind(&room.room_number)
    .bind(room.room_type)
    .bind(room.price)
    .bind(&room.description)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn update_room<'e, E: PgExecutor<'e>>(executor: E, room: &Room) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE rooms
        SET room_number = $2, room_type = $3, price = $4, description = $5
        WHERE id = $1
        "#,
    )
    .bind(room.id)
    .bind(&room.room_number)
    .bind(room.room_type)
    .bind(room.price)
    .bind(&room.description)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Get all amenities
pub async fn list_amenities<'e, E: PgExecutor<'e>>(executor: E) -> sqlx::Result<Vec<Amenity>> {
    sqlx::query_as::<_, Amenity>(
        r#"
        SELECT id, name FROM amenities ORDER BY name
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn insert_amenity<'e, E: PgExecutor<'e>>(
    executor: E,
    amenity: &Amenity,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO amenities (id, name) VALUES ($1, $2)
        "#,
    )
    .bind(amenity.id)
    .bind(&amenity.name)
    .execute(executor)
    .await?;

    Ok(())
}

/// Link an amenity to a room; linking twice is a no-op
pub async fn attach_amenity<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
    amenity_id: Uuid,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO room_amenities (room_id, amenity_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(room_id)
    .bind(amenity_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn insert_photo<'e, E: PgExecutor<'e>>(executor: E, photo: &Photo) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO photos (id, room_id, path) VALUES ($1, $2, $3)
        "#,
    )
    .bind(photo.id)
    .bind(photo.room_id)
    .bind(&photo.path)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn photos_for_room<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
) -> sqlx::Result<Vec<Photo>> {
    sqlx::query_as::<_, Photo>(
        r#"
        SELECT id, room_id, path FROM photos WHERE room_id = $1 ORDER BY path
        "#,
    )
    .bind(room_id)
    .fetch_all(executor)
    .await
}

/// Non-cancelled bookings for a room
pub async fn active_bookings<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
) -> sqlx::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {} FROM bookings WHERE room_id = $1 AND status <> 'CANCELLED' ORDER BY start_date",
        BOOKING_COLUMNS
    );
    sqlx::query_as::<_, Booking>(&sql)
        .bind(room_id)
        .fetch_all(executor)
        .await
}

/// Count active bookings of a room overlapping `[start, end)`, optionally
/// ignoring one booking (the one being edited)
pub async fn count_overlapping<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<Uuid>,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM bookings
        WHERE room_id = $1
          AND status <> 'CANCELLED'
          AND start_date < $3
          AND end_date > $2
          AND ($4::uuid IS NULL OR id <> $4)
        "#,
    )
    .bind(room_id)
    .bind(start)
    .bind(end)
    .bind(exclude)
    .fetch_one(executor)
    .await
}

/// Rooms with an active booking overlapping `[start, end)`
pub async fn booked_room_ids<'e, E: PgExecutor<'e>>(
    executor: E,
    start: NaiveDate,
    end: NaiveDate,
) -> sqlx::Result<Vec<Uuid>> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT room_id
        FROM bookings
        WHERE status <> 'CANCELLED'
          AND start_date < $2
          AND end_date > $1
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

pub async fn find_booking<'e, E: PgExecutor<'e>>(
    executor: E,
    booking_id: Uuid,
) -> sqlx::Result<Option<Booking>> {
    let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
    sqlx::query_as::<_, Booking>(&sql)
        .bind(booking_id)
        .fetch_optional(executor)
        .await
}

pub async fn bookings_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> sqlx::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY start_date",
        BOOKING_COLUMNS
    );
    sqlx::query_as::<_, Booking>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await
}

pub async fn list_bookings<'e, E: PgExecutor<'e>>(executor: E) -> sqlx::Result<Vec<Booking>> {
    let sql = format!("SELECT {} FROM bookings ORDER BY start_date", BOOKING_COLUMNS);
    sqlx::query_as::<_, Booking>(&sql).fetch_all(executor).await
}

pub async fn insert_booking<'e, E: PgExecutor<'e>>(
    executor: E,
    booking: &Booking,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bookings
            (id, user_id, room_id, start_date, end_date, total_price, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(booking.id)
    .bind(booking.user_id)
    .bind(booking.room_id)
    .bind(booking.start_date)
    .bind(booking.end_date)
    .bind(booking.total_price)
    .bind(booking.status)
    .bind(booking.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Move a non-cancelled booking to new dates with its new total
pub async fn reschedule_booking<'e, E: PgExecutor<'e>>(
    executor: E,
    booking_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    total_price: Decimal,
) -> sqlx::Result<Option<Booking>> {
    let sql = format!(
        r#"
        UPDATE bookings
        SET start_date = $2, end_date = $3, total_price = $4
        WHERE id = $1 AND status <> 'CANCELLED'
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    );
    sqlx::query_as::<_, Booking>(&sql)
        .bind(booking_id)
        .bind(start)
        .bind(end)
        .bind(total_price)
        .fetch_optional(executor)
        .await
}

/// Set a booking's status only while it is still in one of `from`.
///
/// Returns `None` when the booking is missing or its status has moved on.
pub async fn transition_booking<'e, E: PgExecutor<'e>>(
    executor: E,
    booking_id: Uuid,
    from: &[BookingStatus],
    to: BookingStatus,
) -> sqlx::Result<Option<Booking>> {
    let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
    let sql = format!(
        r#"
        UPDATE bookings
        SET status = $3
        WHERE id = $1 AND status::text = ANY($2)
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    );
    sqlx::query_as::<_, Booking>(&sql)
        .bind(booking_id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await
}

/// Reprice every active booking of a room at `price` per night.
///
/// Only `total_price` is written; dates and status stay as stored.
pub async fn reprice_active_bookings<'e, E: PgExecutor<'e>>(
    executor: E,
    room_id: Uuid,
    price: Decimal,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET total_price = (end_date - start_date) * $2
        WHERE room_id = $1 AND status <> 'CANCELLED'
        "#,
    )
    .bind(room_id)
    .bind(price)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Get all users
pub async fn list_users<'e, E: PgExecutor<'e>>(executor: E) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT
            id,
            username,
            email,
            first_name,
            last_name,
            date_registered,
            is_admin,
            is_active
        FROM users
        ORDER BY username
        "#,
    )
    .fetch_all(executor)
    .await
}
