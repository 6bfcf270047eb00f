pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod store;
pub mod services;
pub mod controllers;
pub mod middleware;

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::services::ReservationService;
use crate::store::{MemoryStore, PgStore, ReservationStore};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub reservations: ReservationService,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn ReservationStore> = match config.storage.backend {
            StorageBackend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .context("DATABASE_URL must be set for the postgres backend")?;
                let db = database::Database::connect(url, &config.database).await?;
                db.run_migrations().await?;
                Arc::new(PgStore::new(db.pool.clone()))
            }
            StorageBackend::Memory => {
                let store = MemoryStore::new();
                let shows = store.seed_demo_catalog();
                info!("Memory store seeded with {} demo shows", shows);
                Arc::new(store)
            }
        };

        Ok(Arc::new(Self::with_store(store, config)))
    }

    /// Assemble state around an existing store. Used by `new` and by the
    /// test suite, which brings its own memory store.
    pub fn with_store(store: Arc<dyn ReservationStore>, config: Config) -> Self {
        let reservations = ReservationService::new(store.clone());
        Self {
            store,
            reservations,
            config,
        }
    }
}

/// The full application router: banner and health probe at the root, the
/// API mounted under /api, request tracing on everything.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Movie Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
