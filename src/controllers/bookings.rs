use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::Error;
use crate::middleware::AuthUser;
use crate::services::reservations::CancelOutcome;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows/{show_id}/book", post(book_seat))
        .route("/bookings/{booking_id}/cancel", post(cancel_booking))
        .route("/my-bookings", get(my_bookings))
}

// POST /api/shows/{show_id}/book
//
// The handler is pure glue: it parses seat_number out of the body and
// hands the rest to the allocation engine. The parse is explicit rather
// than a typed extractor so a missing or non-integer seat_number is a
// 400 with a stable message.
async fn book_seat(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i64>,
    user: AuthUser,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, Error> {
    let seat_number = body
        .get("seat_number")
        .ok_or_else(|| Error::InvalidInput("seat_number is required".to_string()))?
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| Error::InvalidInput("seat_number must be an integer".to_string()))?;

    let booking = state
        .reservations
        .reserve(show_id, user.user_id, seat_number)
        .await?;
    let details = state.reservations.booking_details(booking).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

// POST /api/bookings/{booking_id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
    user: AuthUser,
) -> Result<impl IntoResponse, Error> {
    let outcome = state.reservations.cancel(booking_id, user.user_id).await?;
    let message = match &outcome {
        CancelOutcome::Cancelled(_) => "Booking cancelled successfully. The seat is now free.",
        CancelOutcome::AlreadyCancelled(_) => "Booking is already cancelled.",
    };
    Ok(Json(json!({
        "message": message,
        "booking": outcome.booking(),
    })))
}

// GET /api/my-bookings - the caller's bookings, most recent first
async fn my_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, Error> {
    let bookings = state.reservations.my_bookings(user.user_id).await?;
    Ok(Json(bookings))
}
