use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use dotenvy::dotenv;
use migration::MigratorTrait;
use sea_orm::Database;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod ratelimit;
mod state;
mod upload;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playdeck=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Playdeck...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations completed");

    // Upload directories must exist before the first multipart request
    for subdir in ["tracks", "artwork"] {
        tokio::fs::create_dir_all(std::path::Path::new(&config.upload_dir).join(subdir)).await?;
    }

    // Seed the administrator credential if configured (the API itself never
    // creates admin accounts)
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        auth::seed_admin(&db, username, password).await?;
    }

    let port = config.server_port;
    let state = AppState::new(db, config);

    // Build application routes
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let mut app = Router::new()
        // API routes (JSON)
        .nest("/api", handlers::api_routes(&state))
        // Uploaded blobs served by path
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir));

    // Serve the bundled front-end in production
    if state.config.is_production() {
        app = app.fallback_service(
            ServeDir::new("client/build").fallback(ServeFile::new("client/build/index.html")),
        );
    }

    app.layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
