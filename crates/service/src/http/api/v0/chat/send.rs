use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::envelope::{PlainEnvelope, StoredMessage, UserId};
use common::relay::RelayEvent;

use crate::database::models::Message;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::http::api::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct SendRequest {
    #[arg(long)]
    pub sender_id: UserId,
    #[arg(long)]
    pub receiver_id: UserId,
    #[serde(default)]
    #[arg(long)]
    pub message: String,
}

pub type SendResponse = StoredMessage;

/// Persist a plaintext message and announce it to relay listeners
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<SendRequest>,
) -> Result<impl IntoResponse, SendError> {
    if req.message.is_empty() {
        return Err(SendError::EmptyMessage);
    }

    let stored = Message::create(req.sender_id, req.receiver_id, &req.message, state.database())
        .await?
        .into_stored()?;

    let report = state.relay().publish(RelayEvent::NewMessage(
        PlainEnvelope {
            sender_id: req.sender_id,
            receiver_id: req.receiver_id,
            message: req.message,
        }
        .into(),
    ));
    tracing::debug!(
        message_id = stored.id,
        delivered = report.delivered,
        "chat message stored"
    );

    Ok((http::StatusCode::CREATED, Json(stored)).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("timestamp format error: {0}")]
    Format(#[from] time::error::Format),
}

impl IntoResponse for SendError {
    fn into_response(self) -> Response {
        match self {
            SendError::EmptyMessage => {
                error_response(http::StatusCode::BAD_REQUEST, "message must not be empty")
            }
            e => {
                tracing::error!("SEND ERROR: {:?}", e);
                error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "could not store message")
            }
        }
    }
}

impl ApiRequest for SendRequest {
    type Response = SendResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/chat")?;
        Ok(client.post(full_url).json(&self))
    }
}
