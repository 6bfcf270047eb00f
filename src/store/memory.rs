use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use crate::error::Error;
use crate::models::{Booking, BookingStatus, Movie, NewUser, Show, User};
use crate::store::ReservationStore;

/// In-process store for local development and tests. One mutex guards the
/// whole ledger: coarser than the per-show locking the Postgres store gets
/// from its row lock, but every reserve is a short critical section and
/// the atomicity requirements hold trivially.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    movies: HashMap<i64, Movie>,
    shows: HashMap<i64, Show>,
    bookings: HashMap<i64, Booking>,
    users: HashMap<i64, User>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_booking_count(&self, show_id: i64) -> i64 {
        self.bookings
            .values()
            .filter(|b| b.show_id == show_id && b.status == BookingStatus::Booked)
            .count() as i64
    }

    fn seat_is_taken(&self, show_id: i64, seat_number: i32) -> bool {
        self.bookings.values().any(|b| {
            b.show_id == show_id
                && b.seat_number == seat_number
                && b.status == BookingStatus::Booked
        })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Populate a small catalog so a memory-backed instance is usable out
    /// of the box. Returns the number of shows created.
    pub fn seed_demo_catalog(&self) -> usize {
        let mut inner = self.lock();
        let demo: [(&str, i32, &[(&str, i32)]); 2] = [
            ("Interstellar", 169, &[("Screen 1", 40), ("Screen 2", 25)]),
            ("Paddington 2", 103, &[("Screen 3", 60)]),
        ];
        let mut shows = 0;
        for (title, duration, screenings) in demo {
            let movie_id = inner.next_id();
            inner.movies.insert(
                movie_id,
                Movie {
                    id: movie_id,
                    title: title.to_string(),
                    duration_minutes: duration,
                },
            );
            for (screen, seats) in screenings {
                let show_id = inner.next_id();
                inner.shows.insert(
                    show_id,
                    Show {
                        id: show_id,
                        movie_id,
                        screen_name: screen.to_string(),
                        date_time: Utc::now().naive_utc(),
                        total_seats: *seats,
                    },
                );
                shows += 1;
            }
        }
        shows
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn create_movie(&self, title: &str, duration_minutes: i32) -> Result<Movie, Error> {
        let mut inner = self.lock();
        let id = inner.next_id();
        let movie = Movie {
            id,
            title: title.to_string(),
            duration_minutes,
        };
        inner.movies.insert(id, movie.clone());
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
        let mut inner = self.lock();
        if !inner.movies.contains_key(&movie_id) {
            return Err(Error::MovieNotFound);
        }
        let id = inner.next_id();
        let show = Show {
            id,
            movie_id,
            screen_name: screen_name.to_string(),
            date_time,
            total_seats,
        };
        inner.shows.insert(id, show.clone());
        Ok(show)
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, Error> {
        let inner = self.lock();
        let mut movies: Vec<Movie> = inner.movies.values().cloned().collect();
        movies.sort_by_key(|m| m.id);
        Ok(movies)
    }

    async fn get_movie(&self, movie_id: i64) -> Result<Option<Movie>, Error> {
        Ok(self.lock().movies.get(&movie_id).cloned())
    }

    async fn shows_for_movie(&self, movie_id: i64) -> Result<Vec<Show>, Error> {
        let inner = self.lock();
        let mut shows: Vec<Show> = inner
            .shows
            .values()
            .filter(|s| s.movie_id == movie_id)
            .cloned()
            .collect();
        shows.sort_by_key(|s| (s.date_time, s.id));
        Ok(shows)
    }

    async fn get_show(&self, show_id: i64) -> Result<Option<Show>, Error> {
        Ok(self.lock().shows.get(&show_id).cloned())
    }

    async fn reserve_seat(
        &self,
        show_id: i64,
        user_id: i64,
        seat_number: i32,
    ) -> Result<Booking, Error> {
        // The whole check-then-insert sequence runs under the ledger lock,
        // so concurrent reservations cannot interleave with it.
        let mut inner = self.lock();
        let total_seats = inner
            .shows
            .get(&show_id)
            .map(|s| s.total_seats)
            .ok_or(Error::ShowNotFound)?;

        if inner.seat_is_taken(show_id, seat_number) {
            return Err(Error::SeatAlreadyBooked(seat_number));
        }
        if inner.active_booking_count(show_id) >= i64::from(total_seats) {
            return Err(Error::ShowFull);
        }

        let id = inner.next_id();
        let booking = Booking {
            id,
            show_id,
            user_id,
            seat_number,
            status: BookingStatus::Booked,
            created_at: Utc::now().naive_utc(),
        };
        inner.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, Error> {
        Ok(self.lock().bookings.get(&booking_id).cloned())
    }

    async fn mark_cancelled(&self, booking_id: i64) -> Result<Booking, Error> {
        let mut inner = self.lock();
        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .ok_or(Error::BookingNotFound)?;
        booking.status = BookingStatus::Cancelled;
        Ok(booking.clone())
    }

    async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, Error> {
        let inner = self.lock();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(bookings)
    }

    async fn booked_count(&self, show_id: i64) -> Result<i64, Error> {
        Ok(self.lock().active_booking_count(show_id))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut inner = self.lock();
        if inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(Error::EmailTaken);
        }
        let id = inner.next_id();
        let user = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            surname: user.surname,
            registered_at: Utc::now().naive_utc(),
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_show(store: &MemoryStore, total_seats: i32) -> i64 {
        let mut inner = store.lock();
        let movie_id = inner.next_id();
        inner.movies.insert(
            movie_id,
            Movie {
                id: movie_id,
                title: "Test Movie".to_string(),
                duration_minutes: 120,
            },
        );
        let show_id = inner.next_id();
        inner.shows.insert(
            show_id,
            Show {
                id: show_id,
                movie_id,
                screen_name: "Screen A".to_string(),
                date_time: Utc::now().naive_utc(),
                total_seats,
            },
        );
        show_id
    }

    #[tokio::test]
    async fn reserve_then_conflict_on_same_seat() {
        let store = MemoryStore::new();
        let show_id = sample_show(&store, 10);

        let booking = store.reserve_seat(show_id, 1, 5).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Booked);
        assert_eq!(booking.seat_number, 5);

        let err = store.reserve_seat(show_id, 2, 5).await.unwrap_err();
        assert!(matches!(err, Error::SeatAlreadyBooked(5)));
        assert_eq!(store.booked_count(show_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_seat_is_reusable() {
        let store = MemoryStore::new();
        let show_id = sample_show(&store, 10);

        let booking = store.reserve_seat(show_id, 1, 3).await.unwrap();
        store.mark_cancelled(booking.id).await.unwrap();

        let rebooked = store.reserve_seat(show_id, 2, 3).await.unwrap();
        assert_ne!(rebooked.id, booking.id);
        assert_eq!(rebooked.user_id, 2);
    }

    #[tokio::test]
    async fn capacity_check_catches_shrunk_show() {
        let store = MemoryStore::new();
        let show_id = sample_show(&store, 3);

        store.reserve_seat(show_id, 1, 1).await.unwrap();
        store.reserve_seat(show_id, 1, 2).await.unwrap();

        // Shrink the show under the active bookings: the count check must
        // now reject a free in-range seat before it overbooks.
        store.lock().shows.get_mut(&show_id).unwrap().total_seats = 2;

        let err = store.reserve_seat(show_id, 2, 3).await.unwrap_err();
        assert!(matches!(err, Error::ShowFull));
        assert_eq!(store.booked_count(show_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_show_is_not_found() {
        let store = MemoryStore::new();
        let err = store.reserve_seat(42, 1, 1).await.unwrap_err();
        assert!(matches!(err, Error::ShowNotFound));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let new_user = NewUser {
            email: "a@example.com".to_string(),
            password_hash: "x".to_string(),
            first_name: "A".to_string(),
            surname: "B".to_string(),
        };
        store.create_user(new_user.clone()).await.unwrap();
        let err = store.create_user(new_user).await.unwrap_err();
        assert!(matches!(err, Error::EmailTaken));
    }
}
