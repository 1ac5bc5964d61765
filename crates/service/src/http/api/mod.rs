use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use http::Method;
use tower_http::cors::{Any, CorsLayer};

pub mod client;
pub mod v0;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let cors_layer = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![ACCEPT, CONTENT_TYPE, ORIGIN])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .nest("/v0", v0::router(state.clone()))
        .with_state(state)
        .layer(cors_layer)
}

/// Error body shared by every API handler: `{ "message": ... }`
pub(crate) fn error_response(status: StatusCode, message: impl ToString) -> Response {
    let body = serde_json::json!({ "message": message.to_string() });
    (status, Json(body)).into_response()
}
