use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Error;
use crate::models::NewUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/signup", post(signup))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    email: String,
    password: String,
    first_name: String,
    surname: String,
}

// POST /api/signup
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(Error::InvalidInput("a valid email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(Error::InvalidInput(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;
    let user = state
        .store
        .create_user(NewUser {
            email: req.email.trim().to_string(),
            password_hash,
            first_name: req.first_name,
            surname: req.surname,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}
