pub mod config;
pub mod countdown;
pub mod forms;
pub mod media;
pub mod models;
pub mod sessions;
pub mod storage;
pub mod templates;
pub mod user_models;
pub mod user_storage;
pub mod web;

pub use config::{AppConfig, EditPolicy};
pub use web::{build_router, AppState};

use tracing_subscriber::EnvFilter;

/// Installs the `fmt` subscriber; `RUST_LOG` overrides the default `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
