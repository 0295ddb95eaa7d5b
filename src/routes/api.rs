//! JSON endpoints: stay quotes and health

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::booking::requests::DatesForm;
use crate::booking::responses::{ErrorResponse, HealthResponse, QuoteResponse};
use crate::booking::{services, BookingError};
use crate::error::AppError;
use crate::AppState;

/// JSON error wrapper so API clients never receive the HTML error page
pub struct ApiError(AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.status_and_message();
        let body = ErrorResponse {
            error_type: error_type(&self.0).to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

fn error_type(err: &AppError) -> &'static str {
    match err {
        AppError::NotFound => "not_found",
        AppError::Unauthorized => "unauthorized",
        AppError::Forbidden => "forbidden",
        AppError::Booking(e) => match e {
            BookingError::InvalidRange { .. } => "invalid_range",
            BookingError::InvalidDate { .. } => "invalid_date",
            BookingError::Overlap { .. } => "overlap",
            BookingError::MissingRoom { .. } => "missing_room",
            BookingError::NotFound { .. } => "not_found",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::Forbidden => "forbidden",
            BookingError::Validation(_) => "validation",
            BookingError::Database(_) => "internal",
            BookingError::Unavailable(_) => "unavailable",
        },
        AppError::Template(_) => "internal",
    }
}

/// Price and availability for `?start_date=..&end_date=..`
pub async fn quote(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(dates): Query<DatesForm>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let range = dates.range()?;
    let result = services::quote(state.repo.as_ref(), room_id, range).await?;
    Ok(Json(QuoteResponse::from_result(result, &state.config.currency)))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            cache: state.cache.stats(),
        }),
    )
}
