use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Domain error taxonomy. Every variant maps to one HTTP status; the
/// messages are stable and surfaced verbatim, except storage failures
/// which are logged and replaced with a generic body.
#[derive(Debug, Error)]
pub enum Error {
    // --- invalid input (400) ---
    #[error("seat number must be between 1 and {total_seats} for this show")]
    SeatOutOfRange { total_seats: i32 },
    #[error("{0}")]
    InvalidInput(String),

    // --- not found (404) ---
    #[error("movie not found")]
    MovieNotFound,
    #[error("show not found")]
    ShowNotFound,
    #[error("booking not found")]
    BookingNotFound,

    // --- conflict (409) ---
    #[error("seat {0} is already booked for this show")]
    SeatAlreadyBooked(i32),
    #[error("show is fully booked (overbooking prevented)")]
    ShowFull,
    #[error("an account with this email already exists")]
    EmailTaken,

    // --- forbidden (403) ---
    #[error("you do not have permission to cancel this booking")]
    NotBookingOwner,

    // --- internal (500), retryable ---
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::SeatOutOfRange { .. } | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::MovieNotFound | Error::ShowNotFound | Error::BookingNotFound => {
                StatusCode::NOT_FOUND
            }
            Error::SeatAlreadyBooked(_) | Error::ShowFull | Error::EmailTaken => {
                StatusCode::CONFLICT
            }
            Error::NotBookingOwner => StatusCode::FORBIDDEN,
            Error::Database(_) | Error::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {:?}", self);
            "an internal server error occurred".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
