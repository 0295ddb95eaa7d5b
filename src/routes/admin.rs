//! Administrator pages: rooms, amenities, photos, users, booking confirmation

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};
use chrono::Utc;
use uuid::Uuid;

use crate::booking::requests::{AmenityForm, AttachAmenityForm, PhotoForm, RoomForm};
use crate::booking::services;
use crate::error::Result;
use crate::models::{Amenity, User};
use crate::AppState;

use super::auth::AdminUser;
use super::views::{rooms_by_id, BookingRow, RoomRow};

/// Admin dashboard template
#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct AdminDashboardTemplate {
    rooms: Vec<RoomRow>,
    bookings: Vec<BookingRow>,
    amenities: Vec<Amenity>,
    has_bookings: bool,
}

/// User management template
#[derive(Template)]
#[template(path = "admin/users.html")]
struct UsersTemplate {
    users: Vec<UserRow>,
}

struct UserRow {
    username: String,
    display_name: String,
    email: String,
    registered: String,
    role: String,
    active: bool,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name(),
            email: user.email.clone(),
            registered: user.date_registered.format("%Y-%m-%d").to_string(),
            role: if user.is_admin { "admin" } else { "guest" }.to_string(),
            active: user.is_active,
        }
    }
}

/// Rooms with today's status, every booking, and the amenity catalogue
pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Html<String>> {
    let currency = &state.config.currency;
    let today = Utc::now().date_naive();

    let statuses = services::room_statuses(state.repo.as_ref(), &state.cache, today).await?;
    let rooms: Vec<RoomRow> = statuses
        .iter()
        .map(|(room, status)| RoomRow::new(room, *status, currency))
        .collect();

    let listing = state.cache.rooms(state.repo.as_ref()).await?;
    let by_id = rooms_by_id(&listing);
    let bookings: Vec<BookingRow> = state
        .repo
        .list_bookings()
        .await?
        .iter()
        .map(|b| BookingRow::new(b, &by_id, currency))
        .collect();

    let template = AdminDashboardTemplate {
        has_bookings: !bookings.is_empty(),
        rooms,
        bookings,
        amenities: state.repo.list_amenities().await?,
    };

    Ok(Html(template.render()?))
}

pub async fn users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Html<String>> {
    let users = state.repo.list_users().await?;
    let template = UsersTemplate {
        users: users.iter().map(UserRow::from).collect(),
    };
    Ok(Html(template.render()?))
}

pub async fn add_room(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<RoomForm>,
) -> Result<Redirect> {
    services::add_room(state.repo.as_ref(), &state.cache, form.to_input()?).await?;
    Ok(Redirect::to("/admin"))
}

/// Edit a room; a price change reprices its active bookings
pub async fn edit_room(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(room_id): Path<Uuid>,
    Form(form): Form<RoomForm>,
) -> Result<Redirect> {
    services::update_room(state.repo.as_ref(), &state.cache, room_id, form.to_input()?).await?;
    Ok(Redirect::to("/admin"))
}

pub async fn add_amenity(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<AmenityForm>,
) -> Result<Redirect> {
    services::add_amenity(state.repo.as_ref(), &form.name).await?;
    Ok(Redirect::to("/admin"))
}

pub async fn attach_amenity(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(room_id): Path<Uuid>,
    Form(form): Form<AttachAmenityForm>,
) -> Result<Redirect> {
    services::attach_amenity(state.repo.as_ref(), &state.cache, room_id, form.amenity_id).await?;
    Ok(Redirect::to("/admin"))
}

pub async fn add_photo(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(room_id): Path<Uuid>,
    Form(form): Form<PhotoForm>,
) -> Result<Redirect> {
    services::add_photo(state.repo.as_ref(), &state.cache, room_id, &form.path).await?;
    Ok(Redirect::to("/admin"))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Redirect> {
    services::confirm_booking(state.repo.as_ref(), booking_id).await?;
    Ok(Redirect::to("/admin"))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Redirect> {
    services::cancel_booking(state.repo.as_ref(), &admin, booking_id).await?;
    Ok(Redirect::to("/admin"))
}
