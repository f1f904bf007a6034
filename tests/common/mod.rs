use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use pitchlink::{app::build_app, config::AppConfig, AppState};
use serde_json::Value;
use tower::ServiceExt;

/// Router over the in-process store plus the state it shares.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, AppState) {
    let state = AppState::in_memory(AppConfig::test_default());
    (build_app(state.clone()), state)
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// Value of the `name` cookie as set by the response.
#[allow(dead_code)]
pub fn session_token(response: &Response<Body>, name: &str) -> String {
    let prefix = format!("{name}=");
    let header = set_cookie_headers(response)
        .into_iter()
        .find(|value| value.starts_with(&prefix))
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}"));
    header[prefix.len()..]
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub fn signup_body(email: &str, role: &str) -> Value {
    serde_json::json!({
        "email": email,
        "username": "midfield10",
        "fullName": "Ama Midfield",
        "password": "correct-horse-battery",
        "role": role,
    })
}
