pub mod auth_routes;
pub mod birthday_routes;
pub mod page_routes;

use crate::templates;
use crate::web::error::AppError;
use axum::response::Html;

pub(crate) fn render_page(name: &str, context: &tera::Context) -> Result<Html<String>, AppError> {
    Ok(Html(templates::render(name, context)?))
}
