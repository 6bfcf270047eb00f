//! Storage backends for the catalog and the reservation ledger.
//!
//! - `postgres` - production path, one transaction with a row lock on the
//!   show to serialize the read-check-insert sequence of a reservation.
//! - `memory` - in-process store for local development and the test suite.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{Booking, Movie, NewUser, Show, User};

/// Storage boundary for the reservation core. The catalog side is
/// read-mostly; `reserve_seat` is the only operation with cross-row
/// invariants and each implementation must make its seat-taken check,
/// capacity check and insert one atomic unit.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    // --- catalog ---
    async fn create_movie(&self, title: &str, duration_minutes: i32) -> Result<Movie, Error>;
    async fn create_show(
        &self,
        movie_id: i64,
        screen_name: &str,
        date_time: chrono::NaiveDateTime,
        total_seats: i32,
    ) -> Result<Show, Error>;
    async fn list_movies(&self) -> Result<Vec<Movie>, Error>;
    async fn get_movie(&self, movie_id: i64) -> Result<Option<Movie>, Error>;
    /// Shows for a movie, ordered by start time.
    async fn shows_for_movie(&self, movie_id: i64) -> Result<Vec<Show>, Error>;
    async fn get_show(&self, show_id: i64) -> Result<Option<Show>, Error>;

    // --- reservation ledger ---
    /// Atomically reserve one seat: fails with `SeatAlreadyBooked` if an
    /// active booking holds it, with `ShowFull` if the show is at capacity,
    /// otherwise inserts and returns the new active booking. All-or-nothing
    /// on storage failure.
    async fn reserve_seat(
        &self,
        show_id: i64,
        user_id: i64,
        seat_number: i32,
    ) -> Result<Booking, Error>;
    async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, Error>;
    /// Flip a booking to cancelled and return it. Safe to call on an
    /// already-cancelled booking.
    async fn mark_cancelled(&self, booking_id: i64) -> Result<Booking, Error>;
    /// The caller's bookings, most recent first.
    async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, Error>;
    /// Number of active bookings for a show.
    async fn booked_count(&self, show_id: i64) -> Result<i64, Error>;

    // --- users (auth collaborator) ---
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
}
