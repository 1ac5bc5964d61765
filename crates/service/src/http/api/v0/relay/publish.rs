use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::envelope::Envelope;
use common::relay::RelayEvent;

use crate::http::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

/// Envelope to push to every eligible listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublishRequest(pub Envelope);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishResponse {
    pub delivered: usize,
    pub dropped: usize,
}

/// Relay an envelope without inspecting or storing it
pub async fn handler(
    State(state): State<ServiceState>,
    Json(PublishRequest(envelope)): Json<PublishRequest>,
) -> impl IntoResponse {
    let report = state.relay().publish(RelayEvent::ReceiveMessage(envelope));
    (
        http::StatusCode::ACCEPTED,
        Json(PublishResponse {
            delivered: report.delivered,
            dropped: report.dropped,
        }),
    )
}

impl ApiRequest for PublishRequest {
    type Response = PublishResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/relay")?;
        Ok(client.post(full_url).json(&self))
    }
}
