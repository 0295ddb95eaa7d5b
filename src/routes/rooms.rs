//! Room listing, search and booking form handlers

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::booking::requests::{DatesForm, SearchQuery};
use crate::booking::{services, BookingError, RoomSearch, RoomStatus};
use crate::error::{AppError, Result};
use crate::models::Room;
use crate::AppState;

use super::auth::CurrentUser;
use super::views::{format_money, RoomRow};

/// Room listing template
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    rooms: Vec<RoomRow>,
    has_rooms: bool,
    room_type: String,
    start_date: String,
    end_date: String,
    q: String,
    message: String,
    has_message: bool,
}

/// Booking form template
#[derive(Template)]
#[template(path = "book_room.html")]
struct BookRoomTemplate {
    room: RoomRow,
    photos: Vec<String>,
    has_photos: bool,
    start_date: String,
    end_date: String,
    message: String,
    has_message: bool,
}

/// Homepage: every room with today's status
pub async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    let today = Utc::now().date_naive();
    let statuses = services::room_statuses(state.repo.as_ref(), &state.cache, today).await?;

    let rooms: Vec<RoomRow> = statuses
        .iter()
        .map(|(room, status)| RoomRow::new(room, *status, &state.config.currency))
        .collect();

    let template = IndexTemplate {
        has_rooms: !rooms.is_empty(),
        rooms,
        room_type: String::new(),
        start_date: String::new(),
        end_date: String::new(),
        q: String::new(),
        message: String::new(),
        has_message: false,
    };

    Ok(Html(template.render()?))
}

/// Search results, rendered with the listing template
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response> {
    let (rooms, message) = match query.to_search() {
        Ok(search) => (run_search(&state, &search).await?, None),
        Err(e) if e.is_recoverable() => (Vec::new(), Some(e.to_string())),
        Err(e) => return Err(e.into()),
    };

    let template = IndexTemplate {
        has_rooms: !rooms.is_empty(),
        rooms,
        room_type: query.room_type.clone().unwrap_or_default(),
        start_date: query.start_date.clone().unwrap_or_default(),
        end_date: query.end_date.clone().unwrap_or_default(),
        q: query.q.clone().unwrap_or_default(),
        has_message: message.is_some(),
        message: message.unwrap_or_default(),
    };

    let status = if template.has_message {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    Ok((status, Html(template.render()?)).into_response())
}

async fn run_search(state: &AppState, search: &RoomSearch) -> Result<Vec<RoomRow>> {
    let rooms = services::search_rooms(state.repo.as_ref(), &state.cache, search).await?;

    let today = Utc::now().date_naive();
    let statuses: HashMap<Uuid, RoomStatus> =
        services::room_statuses(state.repo.as_ref(), &state.cache, today)
            .await?
            .into_iter()
            .map(|(room, status)| (room.id, status))
            .collect();

    Ok(rooms
        .iter()
        .map(|room| {
            let status = statuses
                .get(&room.id)
                .copied()
                .unwrap_or(RoomStatus::Available);
            RoomRow::new(room, status, &state.config.currency)
        })
        .collect())
}

/// Booking form
pub async fn book_form(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> Result<Html<String>> {
    let room = find_room(&state, room_id).await?;
    render_book_form(&state, &room, &DatesForm::default(), None).await
}

/// Booking submission: redirect to the dashboard, or re-render the form with
/// the validation message
pub async fn book(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(room_id): Path<Uuid>,
    Form(form): Form<DatesForm>,
) -> Result<Response> {
    let room = find_room(&state, room_id).await?;

    let result = match form.range() {
        Ok(range) => {
            services::create_booking(
                state.repo.as_ref(),
                actor.user_id,
                room_id,
                range.start(),
                range.end(),
            )
            .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(Redirect::to("/dashboard").into_response()),
        Err(
            e @ (BookingError::InvalidRange { .. }
            | BookingError::InvalidDate { .. }
            | BookingError::Overlap { .. }),
        ) => {
            let status = match e {
                BookingError::Overlap { .. } => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            let page = render_book_form(&state, &room, &form, Some(e.to_string())).await?;
            Ok((status, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn find_room(state: &AppState, room_id: Uuid) -> Result<Room> {
    state
        .repo
        .find_room(room_id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn render_book_form(
    state: &AppState,
    room: &Room,
    form: &DatesForm,
    message: Option<String>,
) -> Result<Html<String>> {
    let photos = state.cache.photos(state.repo.as_ref(), room.id).await?;
    let photos: Vec<String> = photos
        .iter()
        .map(|p| format!("/static/{}", p.path.trim_start_matches('/')))
        .collect();

    let today = Utc::now().date_naive();
    let status = services::room_status(state.repo.as_ref(), room.id, today).await?;
    let mut row = RoomRow::new(room, status, &state.config.currency);
    row.price = format!("{} / night", format_money(room.price, &state.config.currency));

    let template = BookRoomTemplate {
        room: row,
        has_photos: !photos.is_empty(),
        photos,
        start_date: form.start_date.clone(),
        end_date: form.end_date.clone(),
        has_message: message.is_some(),
        message: message.unwrap_or_default(),
    };

    Ok(Html(template.render()?))
}
