//! Integration tests for the Postgres store. They need a live database and
//! are ignored by default; point TEST_DATABASE_URL at a disposable
//! Postgres and run with `cargo test -- --ignored`.

use std::sync::Arc;

use tokio::sync::Barrier;

use movie_booking::config::DatabaseConfig;
use movie_booking::database::Database;
use movie_booking::error::Error;
use movie_booking::models::{BookingStatus, NewUser};
use movie_booking::store::{PgStore, ReservationStore};

fn test_db_config(url: &str) -> DatabaseConfig {
    DatabaseConfig {
        url: Some(url.to_string()),
        pool_size: 10,
        acquire_timeout_secs: 5,
    }
}

async fn pg_store() -> PgStore {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a disposable Postgres");
    let db = Database::connect(&url, &test_db_config(&url))
        .await
        .expect("connect");
    db.run_migrations().await.expect("migrate");
    PgStore::new(db.pool.clone())
}

async fn seeded_show(store: &PgStore, total_seats: i32) -> (i64, i64, i64) {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let movie = store.create_movie("Stalker", 162).await.unwrap();
    let show = store
        .create_show(
            movie.id,
            "Screen 1",
            chrono::Utc::now().naive_utc(),
            total_seats,
        )
        .await
        .unwrap();
    let user_a = store
        .create_user(NewUser {
            email: format!("a-{suffix}@example.com"),
            password_hash: "hash".to_string(),
            first_name: "A".to_string(),
            surname: "Tester".to_string(),
        })
        .await
        .unwrap();
    let user_b = store
        .create_user(NewUser {
            email: format!("b-{suffix}@example.com"),
            password_hash: "hash".to_string(),
            first_name: "B".to_string(),
            surname: "Tester".to_string(),
        })
        .await
        .unwrap();
    (show.id, user_a.id, user_b.id)
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn reserve_conflict_cancel_rebook_cycle() {
    let store = pg_store().await;
    let (show_id, a, b) = seeded_show(&store, 10).await;

    let booking = store.reserve_seat(show_id, a, 1).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Booked);

    let err = store.reserve_seat(show_id, b, 1).await.unwrap_err();
    assert!(matches!(err, Error::SeatAlreadyBooked(1)));

    let cancelled = store.mark_cancelled(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let rebooked = store.reserve_seat(show_id, b, 1).await.unwrap();
    assert_ne!(rebooked.id, booking.id);
    assert_eq!(store.booked_count(show_id).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "needs TEST_DATABASE_URL"]
async fn row_lock_serializes_same_seat_race() {
    let store = Arc::new(pg_store().await);
    let (show_id, a, b) = seeded_show(&store, 10).await;

    let contenders: Vec<i64> = vec![a, b, a, b, a, b, a, b];
    let barrier = Arc::new(Barrier::new(contenders.len()));
    let mut handles = Vec::new();
    for user in contenders {
        let store = store.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            store.reserve_seat(show_id, user, 2).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(Error::SeatAlreadyBooked(2)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(store.booked_count(show_id).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn capacity_check_rejects_after_capacity_shrink() {
    let store = pg_store().await;
    let (show_id, a, b) = seeded_show(&store, 3).await;

    store.reserve_seat(show_id, a, 1).await.unwrap();
    store.reserve_seat(show_id, a, 2).await.unwrap();

    // Shrink the show under its active bookings; the independent count
    // check must refuse the still-free seat 3.
    let url = std::env::var("TEST_DATABASE_URL").unwrap();
    let db = Database::connect(&url, &test_db_config(&url)).await.unwrap();
    sqlx::query("UPDATE shows SET total_seats = 2 WHERE id = $1")
        .bind(show_id)
        .execute(&db.pool)
        .await
        .unwrap();

    let err = store.reserve_seat(show_id, b, 3).await.unwrap_err();
    assert!(matches!(err, Error::ShowFull));
    assert_eq!(store.booked_count(show_id).await.unwrap(), 2);
}
