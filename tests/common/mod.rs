#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use birthday_tracker::models::{Birthday, BirthdayDraft};
use birthday_tracker::user_models::User;
use birthday_tracker::{build_router, AppConfig, AppState};
use chrono::NaiveDate;
use std::sync::Arc;
use tower::ServiceExt;

pub const CSRF: &str = "test-csrf-token";
const BOUNDARY: &str = "----birthday-test-boundary";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let state = Arc::new(AppState::in_memory(config));
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Creates a user with an open session and returns it with the cookie
    /// header that authenticates as it.
    pub async fn logged_in(&self, username: &str) -> (User, String) {
        let user = self
            .state
            .users
            .create_user(User::new(username.to_string(), String::new()))
            .await
            .unwrap();
        let token = self.state.sessions.create(&user.id).await;
        (user, format!("sessionid={token}; csrftoken={CSRF}"))
    }

    pub async fn birthday(&self, owner: Option<&User>, first_name: &str) -> Birthday {
        let draft = BirthdayDraft {
            first_name: first_name.to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 5, 17),
            ..Default::default()
        };
        self.state
            .birthdays
            .create_birthday(owner.map(|u| u.id.clone()), draft)
            .await
            .unwrap()
    }
}

pub fn anonymous_cookie() -> String {
    format!("csrftoken={CSRF}")
}

pub fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(uri: &str, cookie: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// A multipart request with text fields and an optional `(file name, bytes)`
/// image.
pub fn post_multipart(
    uri: &str,
    cookie: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub fn assert_redirect(response: &Response, target: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), target);
}

fn encode(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
