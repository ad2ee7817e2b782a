//! Test utilities for Playdeck
//!
//! Provides helpers for creating isolated test environments with:
//! - In-memory SQLite databases (one per test)
//! - Per-test upload directories under the system temp dir
//! - AppState factories
//! - Test data factories and multipart body builders

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

use crate::{
    auth::{password, token},
    config::Config,
    db::entities::{admin_user, track},
    state::AppState,
};

/// Global counter for test isolation
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn get_test_id() -> u32 {
    TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Setup an in-memory SQLite database with all migrations applied
///
/// Each call creates a fresh, isolated database perfect for parallel testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Create a fresh upload root under the system temp dir, with the fixed
/// tracks/artwork subtrees already in place
pub fn setup_test_upload_dir() -> String {
    let dir = std::env::temp_dir().join(format!(
        "playdeck-test-{}-{}",
        std::process::id(),
        get_test_id()
    ));
    std::fs::create_dir_all(dir.join("tracks")).expect("Failed to create tracks dir");
    std::fs::create_dir_all(dir.join("artwork")).expect("Failed to create artwork dir");
    dir.to_string_lossy().into_owned()
}

/// Create a test configuration with sensible defaults
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 3001,
        jwt_secret: "test-jwt-secret-long-enough-for-hmac".to_string(),
        upload_dir: setup_test_upload_dir(),
        allowed_origins: Vec::new(),
        environment: "test".to_string(),
        admin_username: None,
        admin_password: None,
    }
}

/// Create a complete test AppState with an isolated database, upload dir,
/// and fresh rate-limiter budgets
pub async fn setup_test_app_state() -> AppState {
    let db = setup_test_db().await;
    let config = test_config();
    AppState::new(db, config)
}

// ============================================================================
// Test Data Factories
// ============================================================================

/// Create a test admin user with a real Argon2id hash for `password`
pub async fn create_test_admin(
    db: &DatabaseConnection,
    username: &str,
    plaintext_password: &str,
) -> admin_user::Model {
    let hash = password::hash_password(plaintext_password).expect("Failed to hash password");
    let user = admin_user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(hash),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    user.insert(db).await.expect("Failed to insert test admin")
}

/// Create a test track row pointing at (possibly nonexistent) blob paths
pub async fn create_test_track(
    db: &DatabaseConnection,
    title: &str,
    artist: &str,
    track_order: i32,
) -> track::Model {
    let row = track::ActiveModel {
        title: Set(title.to_string()),
        artist: Set(artist.to_string()),
        album: Set(None),
        duration: Set(None),
        file_path: Set(format!("tracks/{}.mp3", title.to_lowercase())),
        artwork_path: Set(None),
        track_order: Set(track_order),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    row.insert(db).await.expect("Failed to insert test track")
}

/// Issue a valid bearer token for the given admin user against the test
/// state's signing secret
pub fn issue_test_token(state: &AppState, user_id: i32) -> String {
    token::issue(user_id, &state.config.jwt_secret).expect("Failed to issue test token")
}

// ============================================================================
// Multipart helpers
// ============================================================================

pub const TEST_BOUNDARY: &str = "playdeck-test-boundary";

/// One part of a multipart body: a plain text field or a named file with a
/// declared content type
pub enum TestPart<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Assemble a `multipart/form-data` body for handler tests
pub fn multipart_body(parts: &[TestPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
        match part {
            TestPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            TestPart::File {
                field,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{TEST_BOUNDARY}--\r\n").as_bytes());
    body
}

/// The `Content-Type` header value matching [`multipart_body`] output
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={TEST_BOUNDARY}")
}
