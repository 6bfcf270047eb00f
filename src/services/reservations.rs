use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::Error;
use crate::models::{Booking, BookingStatus, Movie, Show};
use crate::store::ReservationStore;

/// The reservation core: seat allocation, cancellation and the read paths
/// derived from the ledger. Controllers stay thin and call into this.
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
}

/// Show enriched with the movie title and the derived availability count.
/// `available_seats` is computed on read and never stored.
#[derive(Debug, Serialize)]
pub struct ShowDetails {
    #[serde(flatten)]
    pub show: Show,
    pub movie_title: String,
    pub available_seats: i64,
}

/// Booking with its show embedded, the shape the booking endpoints return.
#[derive(Debug, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub show_details: ShowDetails,
}

/// Outcome of a cancellation. Cancelling twice is not an error; the second
/// call reports that nothing changed.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Booking),
    AlreadyCancelled(Booking),
}

impl CancelOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            CancelOutcome::Cancelled(b) | CancelOutcome::AlreadyCancelled(b) => b,
        }
    }
}

/// Range check for a requested seat. Seats are numbered 1..=total_seats.
pub fn validate_seat_number(seat_number: i32, total_seats: i32) -> Result<(), Error> {
    if seat_number < 1 || seat_number > total_seats {
        return Err(Error::SeatOutOfRange { total_seats });
    }
    Ok(())
}

impl ReservationService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Allocate one seat on a show for a user.
    ///
    /// Validation short-circuits before any write: the show must exist and
    /// the seat must be in range. The seat-taken check, the capacity check
    /// and the insert are one atomic unit inside the store, so of N
    /// concurrent calls for the same seat exactly one returns a booking
    /// and the rest observe a conflict.
    pub async fn reserve(
        &self,
        show_id: i64,
        user_id: i64,
        seat_number: i32,
    ) -> Result<Booking, Error> {
        let show = self
            .store
            .get_show(show_id)
            .await?
            .ok_or(Error::ShowNotFound)?;
        validate_seat_number(seat_number, show.total_seats)?;

        let booking = self
            .store
            .reserve_seat(show_id, user_id, seat_number)
            .await?;
        info!(
            booking_id = booking.id,
            show_id, seat_number, user_id, "seat reserved"
        );
        Ok(booking)
    }

    /// Cancel a booking on behalf of its owner, freeing the seat.
    ///
    /// Only the booking's own user may cancel it. Cancelling an
    /// already-cancelled booking is a no-op success.
    pub async fn cancel(&self, booking_id: i64, user_id: i64) -> Result<CancelOutcome, Error> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(Error::BookingNotFound)?;
        if booking.user_id != user_id {
            return Err(Error::NotBookingOwner);
        }
        if booking.status == BookingStatus::Cancelled {
            return Ok(CancelOutcome::AlreadyCancelled(booking));
        }

        let cancelled = self.store.mark_cancelled(booking_id).await?;
        info!(
            booking_id,
            show_id = cancelled.show_id,
            seat_number = cancelled.seat_number,
            "booking cancelled, seat freed"
        );
        Ok(CancelOutcome::Cancelled(cancelled))
    }

    // --- query facade ---

    pub async fn list_movies(&self) -> Result<Vec<Movie>, Error> {
        self.store.list_movies().await
    }

    /// Shows for a movie ordered by start time, 404 if the movie is absent.
    pub async fn shows_for_movie(&self, movie_id: i64) -> Result<Vec<ShowDetails>, Error> {
        let movie = self
            .store
            .get_movie(movie_id)
            .await?
            .ok_or(Error::MovieNotFound)?;
        let shows = self.store.shows_for_movie(movie_id).await?;
        let mut details = Vec::with_capacity(shows.len());
        for show in shows {
            details.push(self.decorate_show(show, Some(movie.title.clone())).await?);
        }
        Ok(details)
    }

    pub async fn show_details(&self, show_id: i64) -> Result<ShowDetails, Error> {
        let show = self
            .store
            .get_show(show_id)
            .await?
            .ok_or(Error::ShowNotFound)?;
        self.decorate_show(show, None).await
    }

    /// The user's bookings, most recent first, each with its show embedded.
    pub async fn my_bookings(&self, user_id: i64) -> Result<Vec<BookingDetails>, Error> {
        let bookings = self.store.bookings_for_user(user_id).await?;
        let mut details = Vec::with_capacity(bookings.len());
        for booking in bookings {
            details.push(self.booking_details(booking).await?);
        }
        Ok(details)
    }

    pub async fn booking_details(&self, booking: Booking) -> Result<BookingDetails, Error> {
        let show = self
            .store
            .get_show(booking.show_id)
            .await?
            .ok_or(Error::ShowNotFound)?;
        let show_details = self.decorate_show(show, None).await?;
        Ok(BookingDetails {
            booking,
            show_details,
        })
    }

    async fn decorate_show(
        &self,
        show: Show,
        movie_title: Option<String>,
    ) -> Result<ShowDetails, Error> {
        let movie_title = match movie_title {
            Some(title) => title,
            None => self
                .store
                .get_movie(show.movie_id)
                .await?
                .ok_or(Error::MovieNotFound)?
                .title,
        };
        let booked = self.store.booked_count(show.id).await?;
        Ok(ShowDetails {
            available_seats: i64::from(show.total_seats) - booked,
            show,
            movie_title,
        })
    }
}
