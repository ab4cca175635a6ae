use super::render_page;
use crate::forms::{FormErrors, LoginForm, RegistrationForm};
use crate::web::{
    error::AppError,
    middleware::{RequestContext, SESSION_COOKIE},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/registration/", get(registration_form).post(register))
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", post(logout))
}

fn render_registration(
    ctx: &RequestContext,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Result<Html<String>, AppError> {
    let mut context = ctx.template_context();
    context.insert("form", form);
    context.insert("errors", errors);
    render_page("registration/registration_form.html", &context)
}

async fn registration_form(Extension(ctx): Extension<RequestContext>) -> Result<Html<String>, AppError> {
    render_registration(&ctx, &RegistrationForm::default(), &FormErrors::default())
}

async fn register(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    ctx.check_csrf(&form.csrf_token)?;

    let mut errors = match form.validate() {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors,
    };
    let username = form.username.trim();
    if errors.is_empty() && state.users.get_user_by_username(username).await?.is_some() {
        errors.add("username", "A user with that username already exists.");
    }
    if !errors.is_empty() {
        return Ok(render_registration(&ctx, &form, &errors)?.into_response());
    }

    state.users.register(username, &form.password1).await?;
    Ok(Redirect::to("/").into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginQuery {
    next: String,
}

fn render_login(ctx: &RequestContext, form: &LoginForm, invalid: bool) -> Result<Html<String>, AppError> {
    let mut context = ctx.template_context();
    context.insert("form", form);
    context.insert("invalid", &invalid);
    render_page("registration/login.html", &context)
}

async fn login_form(
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, AppError> {
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    render_login(&ctx, &form, false)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    ctx.check_csrf(&form.csrf_token)?;

    let Some(user) = state
        .users
        .verify_credentials(form.username.trim(), &form.password)
        .await?
    else {
        warn!(username = %form.username, "failed login attempt");
        return Ok(render_login(&ctx, &form, true)?.into_response());
    };

    if let Some(old) = &ctx.session_token {
        state.sessions.destroy(old).await;
    }
    let token = state.sessions.create(&user.id).await;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    info!(username = %user.username, "user logged in");
    Ok((jar.add(cookie), Redirect::to(form.redirect_target())).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogoutForm {
    csrf_token: String,
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
    Form(form): Form<LogoutForm>,
) -> Result<Response, AppError> {
    ctx.check_csrf(&form.csrf_token)?;
    if let Some(token) = &ctx.session_token {
        state.sessions.destroy(token).await;
    }

    let mut anonymous = ctx.clone();
    anonymous.viewer = None;
    anonymous.session_token = None;
    let page = render_page("registration/logged_out.html", &anonymous.template_context())?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, page).into_response())
}
