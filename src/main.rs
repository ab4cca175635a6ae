use anyhow::Context;
use birthday_tracker::{build_router, init_tracing, AppConfig, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load()?;
    info!(
        data_dir = %config.data_dir.display(),
        media_dir = %config.media_dir.display(),
        edit_policy = ?config.edit_policy,
        "configuration loaded"
    );
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState::open(config).context("Failed to initialize storage")?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!("Birthday tracker running on http://{}", bind_addr);
    info!("Routes: / /birthday/ /birthday/create/ /birthday/<id>/ /auth/registration/ /auth/login/");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
