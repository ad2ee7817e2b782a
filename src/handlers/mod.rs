pub mod auth;
pub mod health;
pub mod tracks;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::{ratelimit, state::AppState};

/// Request body ceiling: two 50 MiB files plus metadata fields.
const MAX_REQUEST_BYTES: usize = 105 * 1024 * 1024;

pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Public catalog
        .route("/tracks", get(tracks::list_tracks))

        // Admin login (auth tier on top of the general tier)
        .route(
            "/admin/login",
            post(auth::login).layer(from_fn_with_state(state.clone(), ratelimit::auth_tier)),
        )

        // Admin catalog mutations
        .route(
            "/admin/tracks",
            post(tracks::create_track)
                .layer(from_fn_with_state(state.clone(), ratelimit::upload_tier)),
        )
        .route("/admin/tracks/reorder", put(tracks::reorder_tracks))
        .route(
            "/admin/tracks/:id",
            put(tracks::update_track).delete(tracks::delete_track),
        )

        // General tier wraps every API route
        .layer(from_fn_with_state(state.clone(), ratelimit::general_tier))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}
