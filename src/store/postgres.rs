use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};

use crate::error::Error;
use crate::models::{Booking, BookingStatus, Movie, NewUser, Show, User};
use crate::store::ReservationStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Raw ledger row; `status` is TEXT in the schema and parsed on the way out.
#[derive(FromRow)]
struct BookingRow {
    id: i64,
    show_id: i64,
    user_id: i64,
    seat_number: i32,
    status: String,
    created_at: NaiveDateTime,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, Error> {
        let status = BookingStatus::parse(&self.status).ok_or_else(|| {
            Error::Database(sqlx::Error::Decode(
                format!("unknown booking status '{}'", self.status).into(),
            ))
        })?;
        Ok(Booking {
            id: self.id,
            show_id: self.show_id,
            user_id: self.user_id,
            seat_number: self.seat_number,
            status,
            created_at: self.created_at,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

const BOOKING_COLUMNS: &str = "id, show_id, user_id, seat_number, status, created_at";

#[async_trait]
impl ReservationStore for PgStore {
    async fn create_movie(&self, title: &str, duration_minutes: i32) -> Result<Movie, Error> {
        let movie = sqlx::query_as::<_, Movie>(
            "INSERT INTO movies (title, duration_minutes) VALUES ($1, $2)
             RETURNING id, title, duration_minutes",
        )
        .bind(title)
        .bind(duration_minutes)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn create_show(
        &self,
        movie_id: i64,
        screen_name: &str,
        date_time: NaiveDateTime,
        total_seats: i32,
    ) -> Result<Show, Error> {
        if total_seats < 1 {
            return Err(Error::InvalidInput(
                "total_seats must be at least 1".to_string(),
            ));
        }
        let show = sqlx::query_as::<_, Show>(
            "INSERT INTO shows (movie_id, screen_name, date_time, total_seats)
             VALUES ($1, $2, $3, $4)
             RETURNING id, movie_id, screen_name, date_time, total_seats",
        )
        .bind(movie_id)
        .bind(screen_name)
        .bind(date_time)
        .bind(total_seats)
        .fetch_one(&self.pool)
        .await?;
        Ok(show)
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, Error> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT id, title, duration_minutes FROM movies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn get_movie(&self, movie_id: i64) -> Result<Option<Movie>, Error> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, duration_minutes FROM movies WHERE id = $1",
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn shows_for_movie(&self, movie_id: i64) -> Result<Vec<Show>, Error> {
        let shows = sqlx::query_as::<_, Show>(
            "SELECT id, movie_id, screen_name, date_time, total_seats
             FROM shows WHERE movie_id = $1 ORDER BY date_time",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shows)
    }

    async fn get_show(&self, show_id: i64) -> Result<Option<Show>, Error> {
        let show = sqlx::query_as::<_, Show>(
            "SELECT id, movie_id, screen_name, date_time, total_seats FROM shows WHERE id = $1",
        )
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(show)
    }

    async fn reserve_seat(
        &self,
        show_id: i64,
        user_id: i64,
        seat_number: i32,
    ) -> Result<Booking, Error> {
        let mut tx = self.pool.begin().await?;

        // Lock the show row: every reservation for this show serializes
        // here, which the capacity check requires since it spans all seats.
        // Concurrent reservations for different shows do not contend.
        let total_seats =
            sqlx::query_scalar::<_, i32>("SELECT total_seats FROM shows WHERE id = $1 FOR UPDATE")
                .bind(show_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(Error::ShowNotFound)?;

        let seat_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE show_id = $1 AND seat_number = $2 AND status = 'booked'
            )",
        )
        .bind(show_id)
        .bind(seat_number)
        .fetch_one(&mut *tx)
        .await?;
        if seat_taken {
            // Dropping the transaction rolls it back.
            return Err(Error::SeatAlreadyBooked(seat_number));
        }

        // Independent capacity check, kept even though the partial unique
        // index already rules out double-booked seats: it catches capacity
        // shrink and data anomalies before they become overbooking.
        let booked = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE show_id = $1 AND status = 'booked'",
        )
        .bind(show_id)
        .fetch_one(&mut *tx)
        .await?;
        if booked >= i64::from(total_seats) {
            return Err(Error::ShowFull);
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings (show_id, user_id, seat_number, status)
             VALUES ($1, $2, $3, 'booked')
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(show_id)
        .bind(user_id)
        .bind(seat_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // The partial unique index is the backstop if the seat check
            // above is ever bypassed.
            if is_unique_violation(&e) {
                Error::SeatAlreadyBooked(seat_number)
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        row.into_booking()
    }

    async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, Error> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn mark_cancelled(&self, booking_id: i64) -> Result<Booking, Error> {
        // Single-row update, no cross-row invariant to protect.
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::BookingNotFound)?;
        row.into_booking()
    }

    async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, Error> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn booked_count(&self, show_id: i64) -> Result<i64, Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE show_id = $1 AND status = 'booked'",
        )
        .bind(show_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, first_name, surname)
             VALUES ($1, $2, $3, $4)
             RETURNING id, email, password_hash, first_name, surname, registered_at",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.surname)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::EmailTaken
            } else {
                e.into()
            }
        })?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, first_name, surname, registered_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
