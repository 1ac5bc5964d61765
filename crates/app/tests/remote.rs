mod common;

use std::time::Duration;

use ::common::crypto::KeyStore;
use ::common::session::{MessageLog, PeerStage, RecordContent};
use sealchat::{open_session, FileKeyStore, RelaySocket, RemoteMessageLog};
use service::http::api::v0::chat::SendRequest;

use crate::common::TestRelay;

#[tokio::test]
async fn test_encrypted_message_round_trip_through_relay() {
    let relay = TestRelay::start().await;
    let client = relay.client();
    let alice_keys = tempfile::tempdir().unwrap();
    let bob_keys = tempfile::tempdir().unwrap();
    let alice_store = FileKeyStore::new(alice_keys.path());
    let bob_store = FileKeyStore::new(bob_keys.path());

    let alice_public = alice_store.load_or_generate(1).unwrap().export_public();
    let bob_public = bob_store.load_or_generate(2).unwrap().export_public();

    let alice = open_session(&alice_store, &client, 1, Some((2, &bob_public))).unwrap();
    let bob = open_session(&bob_store, &client, 2, Some((1, &alice_public))).unwrap();
    assert_eq!(bob.stage(1), PeerStage::SecretEstablished);

    let mut bob_socket = RelaySocket::connect(&client, Some(2)).await.unwrap();
    relay.wait_for_listeners(1).await;

    let envelope = alice.send_message(2, "hello").await.unwrap();
    assert_eq!(envelope.encrypted_message.len(), 5 + 16);

    let event = tokio::time::timeout(Duration::from_secs(5), bob_socket.next_event())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let record = bob.on_incoming(event.into_envelope()).unwrap();
    assert_eq!(record.as_text(), Some("hello"));

    bob_socket.close().await.unwrap();
}

#[tokio::test]
async fn test_socket_send_reaches_other_listeners() {
    let relay = TestRelay::start().await;
    let client = relay.client();

    let mut sender = RelaySocket::connect(&client, Some(1)).await.unwrap();
    let mut receiver = RelaySocket::connect(&client, Some(2)).await.unwrap();
    relay.wait_for_listeners(2).await;

    let envelope = ::common::envelope::PlainEnvelope {
        sender_id: 1,
        receiver_id: 2,
        message: "over the socket".into(),
    };
    sender.send(envelope.clone().into()).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), receiver.next_event())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(
        event.into_envelope(),
        ::common::envelope::Envelope::from(envelope)
    );
}

#[tokio::test]
async fn test_bystander_keeps_envelope_unreadable() {
    let relay = TestRelay::start().await;
    let client = relay.client();
    let keys = tempfile::tempdir().unwrap();
    let store = FileKeyStore::new(keys.path());

    let bob_public = store.load_or_generate(2).unwrap().export_public();
    let alice = open_session(&store, &client, 1, Some((2, &bob_public))).unwrap();
    let carol = open_session(&store, &client, 3, None).unwrap();

    let mut carol_socket = RelaySocket::connect(&client, Some(3)).await.unwrap();
    relay.wait_for_listeners(1).await;

    alice.send_message(2, "not for carol").await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), carol_socket.next_event())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let record = carol.on_incoming(event.into_envelope()).unwrap();
    assert!(matches!(record.content, RecordContent::Unreadable { .. }));
}

#[tokio::test]
async fn test_remote_history_is_loaded_once() {
    let relay = TestRelay::start().await;
    let client = relay.client();

    for (sender_id, receiver_id, message) in [(1, 2, "first"), (2, 1, "second")] {
        client
            .call(SendRequest {
                sender_id,
                receiver_id,
                message: message.to_string(),
            })
            .await
            .unwrap();
    }

    let log = RemoteMessageLog::new(client.clone());
    let stored = log.history(2, 1).await.unwrap();
    assert_eq!(stored.len(), 2);

    let keys = tempfile::tempdir().unwrap();
    let session = open_session(&FileKeyStore::new(keys.path()), &client, 1, None).unwrap();
    let records = session.load_history(2).await.unwrap();
    let texts: Vec<_> = records.iter().filter_map(|r| r.as_text()).collect();
    assert_eq!(texts, vec!["first", "second"]);

    // later log entries are not fetched again
    client
        .call(SendRequest {
            sender_id: 1,
            receiver_id: 2,
            message: "third".into(),
        })
        .await
        .unwrap();
    assert_eq!(session.load_history(2).await.unwrap().len(), 2);
}
