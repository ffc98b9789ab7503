pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use crate::engine::ScanEngine;
use crate::services::store::ScanStore;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: config::AppConfig,
    pub store: Arc<dyn ScanStore>,
    pub engine: Arc<dyn ScanEngine>,
}
