use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::ratelimit::RateTiers;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub limiter: Arc<RateTiers>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            limiter: Arc::new(RateTiers::new()),
        }
    }
}
