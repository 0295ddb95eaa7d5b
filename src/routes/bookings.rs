//! Guest dashboard and booking lifecycle handlers

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};
use uuid::Uuid;

use crate::booking::requests::DatesForm;
use crate::booking::services;
use crate::error::Result;
use crate::AppState;

use super::auth::CurrentUser;
use super::views::{rooms_by_id, BookingRow};

/// Guest dashboard template
#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    bookings: Vec<BookingRow>,
    has_bookings: bool,
}

/// The acting user's bookings
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Html<String>> {
    let bookings = state.repo.bookings_for_user(actor.user_id).await?;
    let rooms = state.cache.rooms(state.repo.as_ref()).await?;
    let by_id = rooms_by_id(&rooms);

    let rows: Vec<BookingRow> = bookings
        .iter()
        .map(|b| BookingRow::new(b, &by_id, &state.config.currency))
        .collect();

    let template = DashboardTemplate {
        has_bookings: !rows.is_empty(),
        bookings: rows,
    };

    Ok(Html(template.render()?))
}

/// Cancel one of the acting user's bookings
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Redirect> {
    services::cancel_booking(state.repo.as_ref(), &actor, booking_id).await?;
    Ok(Redirect::to("/dashboard"))
}

/// Move a booking to new dates; the price is recomputed
pub async fn reschedule(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(booking_id): Path<Uuid>,
    Form(form): Form<DatesForm>,
) -> Result<Redirect> {
    let range = form.range()?;
    services::reschedule_booking(
        state.repo.as_ref(),
        &actor,
        booking_id,
        range.start(),
        range.end(),
    )
    .await?;
    Ok(Redirect::to("/dashboard"))
}
