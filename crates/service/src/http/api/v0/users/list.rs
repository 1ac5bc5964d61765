use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::envelope::Identity;

use crate::database::models::User;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::http::api::error_response;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListUsersRequest {}

pub type ListUsersResponse = Vec<Identity>;

pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, ListUsersError> {
    let users = User::list(state.database()).await?;
    Ok(Json(users).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ListUsersError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ListUsersError {
    fn into_response(self) -> Response {
        tracing::error!("LIST USERS ERROR: {:?}", self);
        error_response(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "could not list users",
        )
    }
}

impl ApiRequest for ListUsersRequest {
    type Response = ListUsersResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/users")?;
        Ok(client.get(full_url))
    }
}
