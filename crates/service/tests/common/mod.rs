#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use common::relay::{RelayChannel, RelayPolicy};
use service::{AuthGate, Database, ServiceState};

pub async fn state_with_policy(policy: RelayPolicy) -> ServiceState {
    let database = Database::in_memory().await.unwrap();
    ServiceState::new(
        database,
        RelayChannel::new(policy, 16),
        AuthGate::new(Duration::from_secs(60), 6),
    )
}

pub async fn state() -> ServiceState {
    state_with_policy(RelayPolicy::Broadcast).await
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn parse<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

/// Issue a captcha straight from the gate so the test knows its text
pub fn solved_captcha(state: &ServiceState) -> (Uuid, String) {
    let session = Uuid::new_v4();
    let challenge = state.auth().issue_challenge(session);
    (session, challenge.text)
}

/// Register `username` through the API, returning its assigned id
pub async fn register(router: &Router, state: &ServiceState, username: &str) -> i64 {
    let (session, captcha) = solved_captcha(state);
    let (status, body) = send(
        router,
        post_json(
            "/api/v0/auth/register",
            serde_json::json!({
                "session_id": session,
                "captcha": captcha,
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "hunter22",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

/// Serve `state` on an ephemeral local port
pub async fn serve(state: ServiceState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = service::http::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Wait until the relay has `count` listeners registered
pub async fn wait_for_listeners(state: &ServiceState, count: usize) {
    for _ in 0..200 {
        if state.relay().listener_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} listeners, found {}",
        count,
        state.relay().listener_count()
    );
}
