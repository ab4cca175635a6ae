pub mod error;
pub mod middleware;
pub mod routes;

use crate::config::AppConfig;
use crate::forms::MAX_IMAGE_BYTES;
use crate::sessions::SessionStore;
use crate::storage::BirthdayStorage;
use crate::user_storage::UserStorage;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: AppConfig,
    pub birthdays: BirthdayStorage,
    pub users: UserStorage,
    pub sessions: SessionStore,
}

impl AppState {
    /// Opens the stores under the configured data directory.
    pub fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            birthdays: BirthdayStorage::open(&config.data_dir)?,
            users: UserStorage::open(&config.data_dir)?,
            sessions: SessionStore::new(config.session_ttl()),
            config,
        })
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            birthdays: BirthdayStorage::in_memory(),
            users: UserStorage::in_memory(),
            sessions: SessionStore::new(config.session_ttl()),
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::page_routes::router())
        .merge(routes::birthday_routes::router())
        .merge(routes::auth_routes::router())
        .nest_service("/media", ServeDir::new(&state.config.media_dir))
        .fallback(routes::page_routes::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::request_context))
        .layer(DefaultBodyLimit::max(2 * MAX_IMAGE_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
