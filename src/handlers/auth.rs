use axum::{extract::State, Json};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password, token},
    db::entities::admin_user,
    error::{AppError, Result},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Authenticate the administrator and issue a 24-hour bearer token.
///
/// Unknown username and wrong password produce the identical error, so the
/// response does not leak which one failed.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = admin_user::Entity::find()
        .filter(admin_user::Column::Username.eq(&payload.username))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Argon2 verification is CPU-bound; keep it off the async workers
    let hash = user.password_hash.clone();
    let supplied = payload.password;
    let valid = tokio::task::spawn_blocking(move || password::verify_password(&supplied, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))?;

    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = token::issue(user.id, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token signing failed: {e}")))?;

    tracing::info!(user_id = user.id, "Admin login succeeded");

    Ok(Json(LoginResponse {
        token,
        username: user.username,
    }))
}
