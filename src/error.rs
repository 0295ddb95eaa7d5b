//! Error handling for the application

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::booking::BookingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Page not found")]
    NotFound,

    #[error("Authentication required")]
    Unauthorized,

    #[error("You do not have permission to access this page")]
    Forbidden,

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl AppError {
    /// Status code and user-facing message. Server faults are logged here.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Booking(e) => booking_status(e),
            AppError::Template(e) => {
                tracing::error!("Template error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error".to_string())
            }
        }
    }
}

fn booking_status(err: &BookingError) -> (StatusCode, String) {
    let status = match err {
        BookingError::InvalidRange { .. }
        | BookingError::InvalidDate { .. }
        | BookingError::Validation(_) => StatusCode::BAD_REQUEST,
        BookingError::Overlap { .. } | BookingError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        BookingError::MissingRoom { .. } | BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
        BookingError::Forbidden => StatusCode::FORBIDDEN,
        BookingError::Database(e) => {
            tracing::error!("Database error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            );
        }
        BookingError::Unavailable(reason) => {
            tracing::error!("Room catalogue unavailable: {}", reason);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            );
        }
    };
    (status, err.to_string())
}

/// Error page template
#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let page = ErrorTemplate {
            status: status.as_u16(),
            message,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, page.message).into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
