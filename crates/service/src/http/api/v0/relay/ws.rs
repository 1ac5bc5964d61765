use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use common::envelope::UserId;
use common::relay::{ClientFrame, RelayChannel, RelayEvent};

use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenQuery {
    /// Identity the listener registers as; needed for targeted delivery
    #[serde(default)]
    pub user_id: Option<UserId>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Query(query): Query<ListenQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let relay = state.relay().clone();
    ws.on_upgrade(move |socket| serve_listener(socket, relay, query.user_id))
}

/// Pump relay events out to one socket and client frames back into the relay
///
/// The listener stays registered until the socket closes or errors.
#[tracing::instrument(skip(socket, relay))]
async fn serve_listener(socket: WebSocket, relay: RelayChannel, user_id: Option<UserId>) {
    let subscription = relay.subscribe(user_id);
    let listener = subscription.id();
    tracing::info!(listener, "relay listener connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(listener, "failed to encode relay event: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::SendMessage(envelope)) => {
                                relay.publish(RelayEvent::ReceiveMessage(envelope));
                            }
                            Err(e) => {
                                tracing::warn!(listener, "ignoring malformed frame: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(listener, "socket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    drop(subscription);
    tracing::info!(listener, "relay listener disconnected");
}
