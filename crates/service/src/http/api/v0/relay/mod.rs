use axum::routing::{get, post};
use axum::Router;

pub mod publish;
pub mod ws;

pub use publish::{PublishRequest, PublishResponse};
pub use ws::ListenQuery;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(publish::handler))
        .route("/ws", get(ws::handler))
        .with_state(state)
}
