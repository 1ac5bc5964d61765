//! Typed client for the v0 API
//!
//! Every request type implements [`ApiRequest`] next to its handler, so the
//! server and its clients share one definition of each call.

mod client;
mod error;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

pub use client::ApiClient;
pub use error::ApiError;

pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}
