//! Chat session collaborators backed by a running relay server

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use common::envelope::{Envelope, StoredMessage, UserId};
use common::relay::{ClientFrame, RelayEvent};
use common::session::{EnvelopeSink, MessageLog, PersistenceError, RelayError};
use service::http::api::client::{ApiClient, ApiError};
use service::http::api::v0::chat::HistoryRequest;
use service::http::api::v0::relay::PublishRequest;

/// Message log served by `GET /api/v0/chat/{a}/{b}`
#[derive(Debug, Clone)]
pub struct RemoteMessageLog {
    client: ApiClient,
}

impl RemoteMessageLog {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageLog for RemoteMessageLog {
    async fn history(&self, a: UserId, b: UserId) -> Result<Vec<StoredMessage>, PersistenceError> {
        self.client
            .call(HistoryRequest {
                user_a: a,
                user_b: b,
            })
            .await
            .map_err(|e| match e {
                ApiError::HttpStatus(status, body) => {
                    PersistenceError::Provider(format!("{}: {}", status, body))
                }
                other => PersistenceError::Unavailable(other.to_string()),
            })
    }
}

/// Publishes envelopes through `POST /api/v0/relay`
#[derive(Debug, Clone)]
pub struct HttpEnvelopeSink {
    client: ApiClient,
}

impl HttpEnvelopeSink {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EnvelopeSink for HttpEnvelopeSink {
    async fn publish(&self, envelope: Envelope) -> Result<(), RelayError> {
        let report = self
            .client
            .call(PublishRequest(envelope))
            .await
            .map_err(|e| match e {
                ApiError::HttpStatus(status, body) => {
                    RelayError::Rejected(format!("{}: {}", status, body))
                }
                other => RelayError::Unavailable(other.to_string()),
            })?;
        tracing::debug!(
            delivered = report.delivered,
            dropped = report.dropped,
            "envelope published"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelaySocketError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A live WebSocket connection to the relay
pub struct RelaySocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl std::fmt::Debug for RelaySocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySocket").finish_non_exhaustive()
    }
}

impl RelaySocket {
    /// Register as a relay listener, optionally under `user_id`
    pub async fn connect(client: &ApiClient, user_id: Option<UserId>) -> Result<Self, RelaySocketError> {
        let url = client.relay_ws_url(user_id)?;
        let (stream, _) = connect_async(url.as_str()).await?;
        tracing::info!(%url, "connected to relay");
        Ok(Self { stream })
    }

    /// Next relay event; `None` once the server closes the socket
    ///
    /// Frames that are not relay events are skipped.
    pub async fn next_event(&mut self) -> Result<Option<RelayEvent>, RelaySocketError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => match serde_json::from_str::<RelayEvent>(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => tracing::warn!("ignoring unexpected relay frame: {}", e),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    /// Push an envelope through the socket instead of the HTTP endpoint
    pub async fn send(&mut self, envelope: Envelope) -> Result<(), RelaySocketError> {
        let frame = serde_json::to_string(&ClientFrame::SendMessage(envelope))?;
        self.stream.send(Message::Text(frame)).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<(), RelaySocketError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
