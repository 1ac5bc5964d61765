use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::envelope::{StoredMessage, UserId};

use crate::database::models::Message;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::http::api::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct HistoryRequest {
    pub user_a: UserId,
    pub user_b: UserId,
}

pub type HistoryResponse = Vec<StoredMessage>;

/// Both directions of a conversation, oldest first
pub async fn handler(
    State(state): State<ServiceState>,
    Path((user_a, user_b)): Path<(UserId, UserId)>,
) -> Result<impl IntoResponse, HistoryError> {
    let messages = Message::between(user_a, user_b, state.database())
        .await?
        .into_iter()
        .map(Message::into_stored)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(messages).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("timestamp format error: {0}")]
    Format(#[from] time::error::Format),
}

impl IntoResponse for HistoryError {
    fn into_response(self) -> Response {
        tracing::error!("HISTORY ERROR: {:?}", self);
        error_response(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "could not load history",
        )
    }
}

impl ApiRequest for HistoryRequest {
    type Response = HistoryResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!("/api/v0/chat/{}/{}", self.user_a, self.user_b))?;
        Ok(client.get(full_url))
    }
}
