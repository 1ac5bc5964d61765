use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::prelude::*;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CAPTCHA_MIME_TYPE;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct CaptchaRequest {
    /// Auth session to bind the challenge to; a new one is created if omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaResponse {
    pub session_id: Uuid,
    pub mime_type: String,
    /// Base64-encoded image
    pub image: String,
}

impl CaptchaResponse {
    pub fn image_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.image)
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Query(req): Query<CaptchaRequest>,
) -> Response {
    let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);
    let challenge = state.auth().issue_challenge(session_id);

    Json(CaptchaResponse {
        session_id,
        mime_type: CAPTCHA_MIME_TYPE.to_string(),
        image: BASE64_STANDARD.encode(&challenge.image),
    })
    .into_response()
}

impl ApiRequest for CaptchaRequest {
    type Response = CaptchaResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/auth/captcha")?;
        Ok(client.get(full_url).query(&self))
    }
}
