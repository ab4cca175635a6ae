use super::render_page;
use crate::web::{error::AppError, middleware::RequestContext, AppState};
use axum::{response::Html, routing::get, Extension, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(homepage))
}

async fn homepage(Extension(ctx): Extension<RequestContext>) -> Result<Html<String>, AppError> {
    render_page("pages/index.html", &ctx.template_context())
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
