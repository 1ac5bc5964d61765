use axum::Router;

pub mod auth;
pub mod chat;
pub mod relay;
pub mod users;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/chat", chat::router(state.clone()))
        .nest("/relay", relay::router(state.clone()))
        .with_state(state)
}
