use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::envelope::Identity;

use crate::auth::{hash_password, AuthError, PasswordError};
use crate::database::models::{User, UserError};
use crate::http::api::client::{ApiError, ApiRequest};
use crate::http::api::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RegisterRequest {
    /// Auth session the captcha was issued to
    #[arg(long)]
    pub session_id: Uuid,
    /// Captcha text as read from the image
    #[serde(default)]
    #[arg(long)]
    pub captcha: String,
    #[serde(default)]
    #[arg(long)]
    pub username: String,
    #[serde(default)]
    #[arg(long)]
    pub email: String,
    #[serde(default)]
    #[arg(long)]
    pub password: String,
}

pub type RegisterResponse = Identity;

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, RegisterError> {
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(RegisterError::MissingFields);
    }
    state.auth().require(req.session_id, &req.captcha)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| RegisterError::Internal(e.to_string()))??;

    let user = User::create(&req.username, &req.email, &password_hash, state.database()).await?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((http::StatusCode::CREATED, Json(user.identity())).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("all fields are required")]
    MissingFields,
    #[error("invalid captcha")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    User(#[from] UserError),
    #[error("password error: {0}")]
    Password(#[from] PasswordError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            RegisterError::MissingFields => {
                error_response(http::StatusCode::BAD_REQUEST, "all fields are required")
            }
            RegisterError::Auth(AuthError::CaptchaMismatch) => {
                error_response(http::StatusCode::BAD_REQUEST, "invalid captcha")
            }
            RegisterError::User(UserError::EmailTaken) => {
                error_response(http::StatusCode::CONFLICT, "user already exists")
            }
            e => {
                tracing::error!("REGISTER ERROR: {:?}", e);
                error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "registration failed")
            }
        }
    }
}

impl ApiRequest for RegisterRequest {
    type Response = RegisterResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/auth/register")?;
        Ok(client.post(full_url).json(&self))
    }
}
