#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use common::relay::{RelayChannel, RelayPolicy};
use service::http::api::client::ApiClient;
use service::{AuthGate, Database, ServiceState};

/// A relay server running on an ephemeral local port
pub struct TestRelay {
    pub state: ServiceState,
    pub addr: SocketAddr,
}

impl TestRelay {
    pub async fn start() -> Self {
        let database = Database::in_memory().await.unwrap();
        let state = ServiceState::new(
            database,
            RelayChannel::new(RelayPolicy::Broadcast, 64),
            AuthGate::new(Duration::from_secs(60), 6),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = service::http::router(state.clone());
        tokio::spawn(async move {
            axum_serve(listener, app).await;
        });

        Self { state, addr }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&Url::parse(&format!("http://{}", self.addr)).unwrap()).unwrap()
    }

    pub async fn wait_for_listeners(&self, count: usize) {
        for _ in 0..200 {
            if self.state.relay().listener_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("relay never reached {} listeners", count);
    }
}

async fn axum_serve(listener: tokio::net::TcpListener, app: axum::Router) {
    axum::serve(listener, app).await.unwrap();
}
