use axum::extract::FromRef;

use crate::{config::AppConfig, db::DbPool};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: DbPool,
    pub http: reqwest::Client,
    pub config: AppConfig,
}
