use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use url::Url;

use common::envelope::UserId;

use super::error::ApiError;
use super::ApiRequest;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client)?;
        let response = request_builder.send().await?;

        if response.status().is_success() {
            Ok(response.json::<T::Response>().await?)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    /// WebSocket URL of the relay for a listener registered as `user_id`
    pub fn relay_ws_url(&self, user_id: Option<UserId>) -> Result<Url, ApiError> {
        let mut url = self.remote.join("/api/v0/relay/ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ApiError::UrlParse(url::ParseError::InvalidDomainCharacter))?;
        if let Some(id) = user_id {
            url.query_pairs_mut().append_pair("user_id", &id.to_string());
        }
        Ok(url)
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_ws_url() {
        let client = ApiClient::new(&Url::parse("http://localhost:5000").unwrap()).unwrap();
        assert_eq!(
            client.relay_ws_url(Some(7)).unwrap().as_str(),
            "ws://localhost:5000/api/v0/relay/ws?user_id=7"
        );
        assert_eq!(
            client.relay_ws_url(None).unwrap().as_str(),
            "ws://localhost:5000/api/v0/relay/ws"
        );

        let secure = ApiClient::new(&Url::parse("https://chat.example.com").unwrap()).unwrap();
        assert_eq!(secure.relay_ws_url(None).unwrap().scheme(), "wss");
    }
}
