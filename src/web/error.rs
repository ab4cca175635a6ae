use crate::templates;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,
    #[error("Forbidden")]
    Forbidden,
    #[error("CSRF verification failed")]
    CsrfFailure,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

/// An error page response. It is attached to the response as an extension
/// so the request middleware can render it again with the viewer.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub template: &'static str,
}

impl ErrorPage {
    pub fn render(self, context: &tera::Context) -> Response {
        let mut response = match templates::render(self.template, context) {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(e) => {
                error!(error = ?e, page = self.template, "error page rendering failed");
                (self.status, self.status.canonical_reason().unwrap_or_default()).into_response()
            }
        };
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, template) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "core/404.html"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "core/403.html"),
            AppError::CsrfFailure => (StatusCode::FORBIDDEN, "core/403csrf.html"),
            AppError::BadRequest(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Template(e) => {
                error!(error = ?e, "template rendering failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
            }
            AppError::Internal(e) => {
                error!(error = ?e, "request failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
            }
        };

        ErrorPage { status, template }.render(&tera::Context::new())
    }
}
