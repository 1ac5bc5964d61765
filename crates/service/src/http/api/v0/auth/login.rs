use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::envelope::Identity;

use crate::auth::{verify_password, AuthError, PasswordError};
use crate::database::models::User;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::http::api::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct LoginRequest {
    /// Auth session the captcha was issued to
    #[arg(long)]
    pub session_id: Uuid,
    /// Captcha text as read from the image
    #[serde(default)]
    #[arg(long)]
    pub captcha: String,
    #[serde(default)]
    #[arg(long)]
    pub email: String,
    #[serde(default)]
    #[arg(long)]
    pub password: String,
}

pub type LoginResponse = Identity;

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, LoginError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(LoginError::MissingFields);
    }
    state.auth().require(req.session_id, &req.captcha)?;

    let user = User::find_by_email(&req.email, state.database())
        .await?
        .ok_or(LoginError::UserNotFound)?;

    let password = req.password;
    let phc = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &phc))
        .await
        .map_err(|e| LoginError::Internal(e.to_string()))??;
    if !matches {
        tracing::debug!(user_id = user.id, "login rejected");
        return Err(LoginError::InvalidPassword);
    }

    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(user.identity()).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("email and password are required")]
    MissingFields,
    #[error("invalid captcha")]
    Auth(#[from] AuthError),
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password error: {0}")]
    Password(#[from] PasswordError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match self {
            LoginError::MissingFields => {
                error_response(http::StatusCode::BAD_REQUEST, "email and password are required")
            }
            LoginError::Auth(AuthError::CaptchaMismatch) => {
                error_response(http::StatusCode::BAD_REQUEST, "invalid captcha")
            }
            LoginError::UserNotFound => error_response(http::StatusCode::NOT_FOUND, "user not found"),
            LoginError::InvalidPassword => {
                error_response(http::StatusCode::UNAUTHORIZED, "invalid password")
            }
            e => {
                tracing::error!("LOGIN ERROR: {:?}", e);
                error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "login failed")
            }
        }
    }
}

impl ApiRequest for LoginRequest {
    type Response = LoginResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/auth/login")?;
        Ok(client.post(full_url).json(&self))
    }
}
