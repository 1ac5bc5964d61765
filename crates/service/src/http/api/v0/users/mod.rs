use axum::routing::get;
use axum::Router;

pub mod list;

pub use list::{ListUsersRequest, ListUsersResponse};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(list::handler))
        .with_state(state)
}
