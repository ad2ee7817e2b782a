//! Administrator authentication: Argon2id credential verification, HS256
//! bearer tokens, and the extractor gating every mutating route.

pub mod password;
pub mod token;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::{db::entities::admin_user, error::AppError, state::AppState};

/// Authenticated administrator extracted from a `Authorization: Bearer <token>`
/// header. Use as an extractor parameter in any handler that mutates the
/// catalog. Validation is stateless: signature and expiry only, no database
/// round-trip.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub user_id: i32,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".to_string())
        })?;

        let claims = token::verify(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthAdmin { user_id: claims.sub })
    }
}

/// Insert the administrator row at startup if it does not already exist.
///
/// The public API never creates admin accounts; this env-driven seed is the
/// only way a credential enters the store.
pub async fn seed_admin(
    db: &DatabaseConnection,
    username: &str,
    plaintext_password: &str,
) -> anyhow::Result<()> {
    let existing = admin_user::Entity::find()
        .filter(admin_user::Column::Username.eq(username))
        .one(db)
        .await?;

    if existing.is_some() {
        tracing::debug!("Admin user '{}' already seeded", username);
        return Ok(());
    }

    let hash = password::hash_password(plaintext_password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;

    let user = admin_user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(hash),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    };
    user.insert(db).await?;

    tracing::info!("Seeded admin user '{}'", username);
    Ok(())
}
