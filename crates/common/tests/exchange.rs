mod common;

use ::common::crypto::{MemoryKeyStore, TAG_SIZE, IV_SIZE};
use ::common::envelope::{Envelope, PairKey};
use ::common::relay::{RelayChannel, RelayEvent, RelayPolicy};
use ::common::session::{MemoryMessageLog, PeerStage, RecordContent, SessionError};

#[tokio::test]
async fn test_two_party_exchange_over_relay() {
    let keys = MemoryKeyStore::new();
    let log = MemoryMessageLog::new();
    let relay = RelayChannel::default();

    let alice = common::join(1, &keys, &log, &relay);
    let bob = common::join(2, &keys, &log, &relay);
    common::handshake(&alice, &bob);

    alice.session.send_message(2, "hello").await.unwrap();

    let events = bob.inbox.drain();
    assert_eq!(events.len(), 1);
    let RelayEvent::ReceiveMessage(Envelope::Encrypted(envelope)) = events[0].clone() else {
        panic!("expected an encrypted receive_message event");
    };
    assert_eq!(envelope.sender_id, 1);
    assert_eq!(envelope.receiver_id, 2);
    assert_eq!(envelope.encrypted_message.len(), "hello".len() + TAG_SIZE);
    assert_eq!(envelope.iv.len(), IV_SIZE);

    let record = bob.session.on_incoming(envelope.into()).unwrap();
    assert_eq!(record.as_text(), Some("hello"));

    // alice's own broadcast comes back to her and is suppressed
    assert_eq!(alice.pump(), 1);
    assert_eq!(alice.session.cached(2).len(), 1);
}

#[tokio::test]
async fn test_bystander_stores_broadcast_undecrypted() {
    let keys = MemoryKeyStore::new();
    let log = MemoryMessageLog::new();
    let relay = RelayChannel::default();

    let alice = common::join(1, &keys, &log, &relay);
    let bob = common::join(2, &keys, &log, &relay);
    let carol = common::join(3, &keys, &log, &relay);
    common::handshake(&alice, &bob);

    alice.session.send_message(2, "for bob only").await.unwrap();

    assert_eq!(carol.pump(), 1);
    let cached = carol.session.cache().records(PairKey::new(1, 2)).unwrap();
    assert_eq!(cached.len(), 1);
    assert!(matches!(cached[0].content, RecordContent::Unreadable { .. }));

    assert_eq!(bob.pump(), 1);
    assert_eq!(bob.session.cached(1)[0].as_text(), Some("for bob only"));
}

#[tokio::test]
async fn test_targeted_relay_skips_bystander() {
    let keys = MemoryKeyStore::new();
    let log = MemoryMessageLog::new();
    let relay = RelayChannel::new(RelayPolicy::Targeted, 16);

    let alice = common::join(1, &keys, &log, &relay);
    let bob = common::join(2, &keys, &log, &relay);
    let carol = common::join(3, &keys, &log, &relay);
    common::handshake(&alice, &bob);

    alice.session.send_message(2, "private").await.unwrap();

    assert_eq!(carol.pump(), 0);
    assert_eq!(bob.pump(), 1);
}

#[tokio::test]
async fn test_no_publish_before_secret() {
    let keys = MemoryKeyStore::new();
    let log = MemoryMessageLog::new();
    let relay = RelayChannel::default();

    let alice = common::join(1, &keys, &log, &relay);
    let bob = common::join(2, &keys, &log, &relay);

    let result = alice.session.send_message(2, "hello?").await;
    assert!(matches!(result, Err(SessionError::NoSharedSecret(2))));
    assert_eq!(alice.session.stage(2), PeerStage::NoKeyExchange);
    assert_eq!(bob.pump(), 0);
}

#[tokio::test]
async fn test_late_key_exchange_reveals_later_messages() {
    let keys = MemoryKeyStore::new();
    let log = MemoryMessageLog::new();
    let relay = RelayChannel::default();

    let alice = common::join(1, &keys, &log, &relay);
    let bob = common::join(2, &keys, &log, &relay);

    // alice knows bob's key, bob has not taken alice's yet
    alice
        .session
        .exchange_keys(2, &bob.session.export_public())
        .unwrap();
    alice.session.send_message(2, "early").await.unwrap();
    bob.pump();

    bob.session
        .exchange_keys(1, &alice.session.export_public())
        .unwrap();
    alice.session.send_message(2, "late").await.unwrap();
    bob.pump();

    let records = bob.session.cached(1);
    assert_eq!(records.len(), 2);
    assert!(!records[0].is_readable());
    assert_eq!(records[1].as_text(), Some("late"));
}

#[tokio::test]
async fn test_history_then_live() {
    let keys = MemoryKeyStore::new();
    let log = MemoryMessageLog::new();
    let relay = RelayChannel::default();

    log.append(1, 2, "yesterday");
    log.append(2, 1, "and again");

    let alice = common::join(1, &keys, &log, &relay);
    let history = alice.session.load_history(2).await.unwrap();
    assert_eq!(history.len(), 2);

    let bob = common::join(2, &keys, &log, &relay);
    common::handshake(&alice, &bob);
    bob.session.send_message(1, "today").await.unwrap();
    alice.pump();

    let texts: Vec<_> = alice
        .session
        .load_history(2)
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.as_text().map(str::to_string))
        .collect();
    assert_eq!(texts, vec!["yesterday", "and again", "today"]);
}
