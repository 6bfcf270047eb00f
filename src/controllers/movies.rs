use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::Error;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/{movie_id}/shows", get(list_shows))
        .route("/shows/{show_id}", get(get_show))
}

// GET /api/movies - public
async fn list_movies(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, Error> {
    let movies = state.reservations.list_movies().await?;
    Ok(Json(movies))
}

// GET /api/movies/{movie_id}/shows - public, ordered by start time
async fn list_shows(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let shows = state.reservations.shows_for_movie(movie_id).await?;
    Ok(Json(shows))
}

// GET /api/shows/{show_id} - includes the derived available_seats count
async fn get_show(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let show = state.reservations.show_details(show_id).await?;
    Ok(Json(show))
}
