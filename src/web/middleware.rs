use crate::sessions::new_token;
use crate::user_models::Viewer;
use crate::web::{
    error::{AppError, ErrorPage},
    AppState,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::warn;

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";

/// Per-request data every handler and template needs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub viewer: Option<Viewer>,
    pub session_token: Option<String>,
    pub csrf_token: String,
}

impl RequestContext {
    pub fn user_id(&self) -> Option<&str> {
        self.viewer.as_ref().map(|v| v.id.as_str())
    }

    /// Compares a submitted form token with the cookie token.
    pub fn check_csrf(&self, submitted: &str) -> Result<(), AppError> {
        if !submitted.is_empty() && submitted == self.csrf_token {
            Ok(())
        } else {
            warn!("CSRF token mismatch");
            Err(AppError::CsrfFailure)
        }
    }

    /// Base template context carrying the viewer and CSRF token.
    pub fn template_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("viewer", &self.viewer);
        context.insert("csrf_token", &self.csrf_token);
        context
    }
}

/// Resolves the session cookie into the current viewer and makes sure the
/// client holds a CSRF cookie.
pub async fn request_context(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let user_id = match &session_token {
        Some(token) => state.sessions.user_id(token).await,
        None => None,
    };
    let viewer = match user_id {
        Some(id) => state.users.get_user(&id).await?.as_ref().map(Viewer::from),
        None => None,
    };

    let existing_csrf = jar
        .get(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let issued_csrf = existing_csrf.is_none();
    let csrf_token = existing_csrf.unwrap_or_else(new_token);

    let ctx = RequestContext {
        viewer,
        session_token,
        csrf_token: csrf_token.clone(),
    };
    req.extensions_mut().insert(ctx.clone());

    let mut response = next.run(req).await;
    // Error pages are rendered without the request; redo them with the viewer.
    if let Some(page) = response.extensions().get::<ErrorPage>().copied() {
        response = page.render(&ctx.template_context());
    }
    if issued_csrf {
        let cookie = Cookie::build((CSRF_COOKIE, csrf_token))
            .path("/")
            .same_site(SameSite::Lax)
            .build();
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}
