use axum::routing::{get, post};
use axum::Router;

pub mod captcha;
pub mod login;
pub mod register;

pub use captcha::{CaptchaRequest, CaptchaResponse};
pub use login::{LoginRequest, LoginResponse};
pub use register::{RegisterRequest, RegisterResponse};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/captcha", get(captcha::handler))
        .route("/register", post(register::handler))
        .route("/login", post(login::handler))
        .with_state(state)
}
