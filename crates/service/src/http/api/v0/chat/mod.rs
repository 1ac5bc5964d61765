use axum::routing::{get, post};
use axum::Router;

pub mod history;
pub mod send;

pub use history::{HistoryRequest, HistoryResponse};
pub use send::{SendRequest, SendResponse};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(send::handler))
        .route("/:user_a/:user_b", get(history::handler))
        .with_state(state)
}
