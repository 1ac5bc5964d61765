use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::cache::{CachePolicy, ChatCache, ChatRecord, RecordOrigin};
use super::peer::{PeerStage, PeerState};
use super::provider::{EnvelopeSink, MessageLog, PersistenceError, RelayError};
use crate::crypto::{
    decrypt_text, derive, encrypt_text, AgreementError, CipherError, KeyError, KeyPair, PublicKey,
    SharedSecret,
};
use crate::envelope::{EncryptedEnvelope, Envelope, PairKey, UserId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("must exchange keys first with peer {0}")]
    NoSharedSecret(UserId),
    #[error("no public key supplied for peer {0}")]
    MissingPeerKey(UserId),
    #[error("session is closed")]
    Closed,
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("agreement error: {0}")]
    Agreement(#[from] AgreementError),
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
}

/// One local identity's view of all its conversations
///
/// Holds the local [`KeyPair`], per-peer handshake state, and the
/// [`ChatCache`]. Shared secrets live only here, in memory. All methods take
/// `&self`; wrap the session in an `Arc` to drive it from several tasks.
#[derive(Debug)]
pub struct ChatSession<L, S>
where
    L: MessageLog,
    S: EnvelopeSink,
{
    identity: UserId,
    key_pair: RwLock<KeyPair>,
    peers: RwLock<HashMap<UserId, PeerState>>,
    cache: ChatCache,
    log: L,
    sink: S,
    closed: watch::Sender<bool>,
}

impl<L, S> ChatSession<L, S>
where
    L: MessageLog,
    S: EnvelopeSink,
{
    pub fn new(identity: UserId, key_pair: KeyPair, log: L, sink: S) -> Self {
        Self::with_cache_policy(identity, key_pair, log, sink, CachePolicy::default())
    }

    pub fn with_cache_policy(
        identity: UserId,
        key_pair: KeyPair,
        log: L,
        sink: S,
        policy: CachePolicy,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            identity,
            key_pair: RwLock::new(key_pair),
            peers: RwLock::new(HashMap::new()),
            cache: ChatCache::new(policy),
            log,
            sink,
            closed,
        }
    }

    pub fn identity(&self) -> UserId {
        self.identity
    }

    pub fn cache(&self) -> &ChatCache {
        &self.cache
    }

    /// Our public key in its exchange form
    pub fn export_public(&self) -> String {
        self.key_pair.read().export_public()
    }

    pub fn stage(&self, peer: UserId) -> PeerStage {
        self.peers
            .read()
            .get(&peer)
            .map(PeerState::stage)
            .unwrap_or(PeerStage::NoKeyExchange)
    }

    pub fn peer_public_key(&self, peer: UserId) -> Option<PublicKey> {
        self.peers.read().get(&peer).map(|p| p.peer_public().clone())
    }

    /// Record the peer's public key, moving it to `KeysExchanged`
    ///
    /// A previously established secret for this peer is discarded; call
    /// [`Self::establish_secret`] again to use the new key.
    pub fn supply_peer_key(&self, peer: UserId, serialized: &str) -> Result<(), SessionError> {
        let peer_public = PublicKey::from_jwk(serialized)?;
        tracing::debug!(
            peer,
            fingerprint = %peer_public.fingerprint(),
            "peer public key supplied"
        );
        self.peers
            .write()
            .insert(peer, PeerState::KeysExchanged { peer_public });
        Ok(())
    }

    /// Derive the shared secret for a peer whose key we hold
    ///
    /// Deriving again replaces the previous secret.
    pub fn establish_secret(&self, peer: UserId) -> Result<(), SessionError> {
        let peer_public = self
            .peer_public_key(peer)
            .ok_or(SessionError::MissingPeerKey(peer))?;
        let secret = {
            let pair = self.key_pair.read();
            derive(pair.private_key(), &peer_public)?
        };
        self.peers.write().insert(
            peer,
            PeerState::SecretEstablished {
                peer_public,
                secret,
            },
        );
        tracing::info!(peer, "shared secret established");
        Ok(())
    }

    /// Supply the peer's key and derive the secret in one step
    pub fn exchange_keys(&self, peer: UserId, serialized: &str) -> Result<(), SessionError> {
        self.supply_peer_key(peer, serialized)?;
        self.establish_secret(peer)
    }

    /// Swap in a new local key pair
    ///
    /// Every established secret was derived from the old private key, so all
    /// peers fall back to `KeysExchanged`. Persisting the new pair is the
    /// caller's job.
    pub fn replace_key_pair(&self, key_pair: KeyPair) {
        *self.key_pair.write() = key_pair;
        let mut peers = self.peers.write();
        let reverted: HashMap<UserId, PeerState> = peers
            .drain()
            .map(|(peer, state)| (peer, state.revert()))
            .collect();
        *peers = reverted;
        tracing::info!("local key pair replaced, shared secrets invalidated");
    }

    fn secret_for(&self, peer: UserId) -> Option<SharedSecret> {
        self.peers
            .read()
            .get(&peer)
            .and_then(|p| p.secret().cloned())
    }

    /// Encrypt `text` for `peer`, hand the envelope to the relay, and echo it
    /// locally once the relay has taken it
    ///
    /// # Errors
    ///
    /// [`SessionError::NoSharedSecret`] unless the peer is in
    /// `SecretEstablished`; nothing is cached or published in that case.
    /// A relay failure is returned as-is and leaves the cache untouched.
    pub async fn send_message(
        &self,
        peer: UserId,
        text: &str,
    ) -> Result<EncryptedEnvelope, SessionError> {
        let secret = self
            .secret_for(peer)
            .ok_or(SessionError::NoSharedSecret(peer))?;
        let sealed = encrypt_text(secret.bytes(), text)?;
        let envelope = EncryptedEnvelope::seal(self.identity, peer, sealed);

        // echo only what the relay accepted
        self.sink.publish(envelope.clone().into()).await?;
        self.cache.append(ChatRecord::text(
            self.identity,
            peer,
            RecordOrigin::Local,
            text,
        ));

        tracing::debug!(
            peer,
            bytes = envelope.encrypted_message.len(),
            "message sent"
        );
        Ok(envelope)
    }

    /// Handle an envelope delivered by the relay
    ///
    /// Returns `None` for our own reflected envelopes. Anything else is
    /// cached: opened when we hold the sender's secret and the tag verifies,
    /// otherwise kept as an unreadable record.
    pub fn on_incoming(&self, envelope: Envelope) -> Option<ChatRecord> {
        if envelope.sender_id() == self.identity {
            return None;
        }

        let record = match envelope {
            Envelope::Plain(plain) => ChatRecord::text(
                plain.sender_id,
                plain.receiver_id,
                RecordOrigin::Relay,
                plain.message,
            ),
            Envelope::Encrypted(sealed) => self.open(sealed),
        };
        self.cache.append(record.clone());
        Some(record)
    }

    fn open(&self, envelope: EncryptedEnvelope) -> ChatRecord {
        let Some(secret) = self.secret_for(envelope.sender_id) else {
            tracing::debug!(
                sender_id = envelope.sender_id,
                "no shared secret for sender, keeping envelope sealed"
            );
            return ChatRecord::unreadable(envelope);
        };

        match decrypt_text(
            secret.bytes(),
            &envelope.encrypted_message,
            &envelope.iv,
        ) {
            Ok(text) => ChatRecord::text(
                envelope.sender_id,
                envelope.receiver_id,
                RecordOrigin::Relay,
                text,
            ),
            Err(e) => {
                tracing::warn!(
                    sender_id = envelope.sender_id,
                    receiver_id = envelope.receiver_id,
                    "failed to open envelope: {}",
                    e
                );
                ChatRecord::unreadable(envelope)
            }
        }
    }

    /// Cached conversation with `peer`, without touching the message log
    pub fn cached(&self, peer: UserId) -> Vec<ChatRecord> {
        self.cache
            .records(PairKey::new(self.identity, peer))
            .unwrap_or_default()
    }

    /// The conversation with `peer`, fetching persisted history on first use
    ///
    /// After the first successful load the cache is the source of truth and
    /// the log is not consulted again. A failed or cancelled fetch leaves the
    /// cache untouched, so the call can be retried.
    pub async fn load_history(&self, peer: UserId) -> Result<Vec<ChatRecord>, SessionError> {
        let key = PairKey::new(self.identity, peer);
        if self.cache.is_loaded(key) {
            return Ok(self.cached(peer));
        }

        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(SessionError::Closed);
        }

        let fetched = tokio::select! {
            result = self.log.history(self.identity, peer) => result?,
            _ = closed.wait_for(|c| *c) => {
                tracing::debug!(peer, "history load cancelled");
                return Err(SessionError::Closed);
            }
        };

        let history = fetched
            .into_iter()
            .map(|m| ChatRecord::text(m.sender_id, m.receiver_id, RecordOrigin::History, m.message))
            .collect();
        Ok(self.cache.merge_history(key, history))
    }

    /// Tear the session down, cancelling in-flight history loads
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::crypto::TAG_SIZE;
    use crate::envelope::{PlainEnvelope, StoredMessage};
    use crate::session::MemoryMessageLog;

    #[derive(Debug, Clone, Default)]
    struct RecordingSink {
        published: Arc<Mutex<Vec<Envelope>>>,
    }

    #[async_trait]
    impl EnvelopeSink for RecordingSink {
        async fn publish(&self, envelope: Envelope) -> Result<(), RelayError> {
            self.published.lock().push(envelope);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct DownSink;

    #[async_trait]
    impl EnvelopeSink for DownSink {
        async fn publish(&self, _: Envelope) -> Result<(), RelayError> {
            Err(RelayError::Unavailable("relay offline".into()))
        }
    }

    /// A log whose fetch never completes
    #[derive(Debug)]
    struct StalledLog;

    #[async_trait]
    impl MessageLog for StalledLog {
        async fn history(&self, _: UserId, _: UserId) -> Result<Vec<StoredMessage>, PersistenceError> {
            futures::future::pending().await
        }
    }

    #[derive(Debug)]
    struct BrokenLog;

    #[async_trait]
    impl MessageLog for BrokenLog {
        async fn history(&self, _: UserId, _: UserId) -> Result<Vec<StoredMessage>, PersistenceError> {
            Err(PersistenceError::Unavailable("connection refused".into()))
        }
    }

    fn session(id: UserId) -> (ChatSession<MemoryMessageLog, RecordingSink>, RecordingSink) {
        let sink = RecordingSink::default();
        let session = ChatSession::new(
            id,
            KeyPair::generate().unwrap(),
            MemoryMessageLog::new(),
            sink.clone(),
        );
        (session, sink)
    }

    fn pair() -> (
        (ChatSession<MemoryMessageLog, RecordingSink>, RecordingSink),
        (ChatSession<MemoryMessageLog, RecordingSink>, RecordingSink),
    ) {
        let a = session(1);
        let b = session(2);
        a.0.exchange_keys(2, &b.0.export_public()).unwrap();
        b.0.exchange_keys(1, &a.0.export_public()).unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_stage_transitions() {
        let (alice, _) = session(1);
        let (bob, _) = session(2);

        assert_eq!(alice.stage(2), PeerStage::NoKeyExchange);
        alice.supply_peer_key(2, &bob.export_public()).unwrap();
        assert_eq!(alice.stage(2), PeerStage::KeysExchanged);
        alice.establish_secret(2).unwrap();
        assert_eq!(alice.stage(2), PeerStage::SecretEstablished);
    }

    #[tokio::test]
    async fn test_send_without_secret_never_publishes() {
        let (alice, sink) = session(1);
        let (bob, _) = session(2);

        let err = alice.send_message(2, "too early").await.unwrap_err();
        assert!(matches!(err, SessionError::NoSharedSecret(2)));
        assert!(err.to_string().contains("must exchange keys first"));

        // keys exchanged but no secret yet
        alice.supply_peer_key(2, &bob.export_public()).unwrap();
        assert!(matches!(
            alice.send_message(2, "still early").await,
            Err(SessionError::NoSharedSecret(2))
        ));

        assert!(sink.published.lock().is_empty());
        assert!(alice.cached(2).is_empty());
    }

    #[tokio::test]
    async fn test_failed_publish_leaves_no_echo() {
        let (bob, _) = session(2);
        let alice = ChatSession::new(1, KeyPair::generate().unwrap(), MemoryMessageLog::new(), DownSink);
        alice.exchange_keys(2, &bob.export_public()).unwrap();

        let err = alice.send_message(2, "never sent").await.unwrap_err();
        assert!(matches!(err, SessionError::Relay(RelayError::Unavailable(_))));
        assert!(alice.cached(2).is_empty());
    }

    #[test]
    fn test_establish_without_key_fails() {
        let (alice, _) = session(1);
        assert!(matches!(
            alice.establish_secret(9),
            Err(SessionError::MissingPeerKey(9))
        ));
    }

    #[test]
    fn test_malformed_peer_key_rejected() {
        let (alice, _) = session(1);
        assert!(matches!(
            alice.supply_peer_key(2, "{\"kty\":\"EC\"}"),
            Err(SessionError::Key(KeyError::Malformed(_)))
        ));
        assert_eq!(alice.stage(2), PeerStage::NoKeyExchange);
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let ((alice, alice_sink), (bob, _)) = pair();

        let envelope = alice.send_message(2, "hello").await.unwrap();
        assert_eq!(envelope.sender_id, 1);
        assert_eq!(envelope.receiver_id, 2);
        assert_eq!(envelope.encrypted_message.len(), "hello".len() + TAG_SIZE);
        assert_eq!(envelope.iv.len(), 12);
        assert_eq!(alice_sink.published.lock().len(), 1);

        // local echo
        assert_eq!(alice.cached(2)[0].as_text(), Some("hello"));
        assert_eq!(alice.cached(2)[0].origin, RecordOrigin::Local);

        let record = bob.on_incoming(envelope.into()).unwrap();
        assert_eq!(record.as_text(), Some("hello"));
        assert_eq!(bob.cached(1).len(), 1);
    }

    #[tokio::test]
    async fn test_own_echo_ignored() {
        let ((alice, alice_sink), _) = pair();
        alice.send_message(2, "mine").await.unwrap();

        let echoed = alice_sink.published.lock()[0].clone();
        assert!(alice.on_incoming(echoed).is_none());
        assert_eq!(alice.cached(2).len(), 1);
    }

    #[tokio::test]
    async fn test_outsider_keeps_envelope_sealed() {
        let ((alice, _), _) = pair();
        let (carol, _) = session(3);

        let envelope = alice.send_message(2, "not for carol").await.unwrap();
        let record = carol.on_incoming(envelope.clone().into()).unwrap();

        assert!(!record.is_readable());
        let cached = carol
            .cache()
            .records(PairKey::new(1, 2))
            .unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0], ChatRecord::unreadable(envelope));
    }

    #[tokio::test]
    async fn test_tampered_envelope_kept_unreadable() {
        let ((alice, _), (bob, _)) = pair();
        let mut envelope = alice.send_message(2, "fragile").await.unwrap();
        envelope.encrypted_message[0] ^= 0xFF;

        let record = bob.on_incoming(envelope.into()).unwrap();
        assert!(!record.is_readable());
    }

    #[tokio::test]
    async fn test_plain_envelope_cached_as_text() {
        let (bob, _) = session(2);
        let record = bob
            .on_incoming(
                PlainEnvelope {
                    sender_id: 1,
                    receiver_id: 2,
                    message: "legacy".into(),
                }
                .into(),
            )
            .unwrap();
        assert_eq!(record.as_text(), Some("legacy"));
    }

    #[tokio::test]
    async fn test_replace_key_pair_invalidates_secrets() {
        let ((alice, _), (bob, _)) = pair();
        alice.replace_key_pair(KeyPair::generate().unwrap());

        assert_eq!(alice.stage(2), PeerStage::KeysExchanged);
        assert!(matches!(
            alice.send_message(2, "stale").await,
            Err(SessionError::NoSharedSecret(2))
        ));

        // bob must learn the new key before messages flow again
        alice.establish_secret(2).unwrap();
        bob.exchange_keys(1, &alice.export_public()).unwrap();
        let envelope = alice.send_message(2, "fresh").await.unwrap();
        assert_eq!(bob.on_incoming(envelope.into()).unwrap().as_text(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_load_history_is_idempotent() {
        let log = MemoryMessageLog::new();
        log.append(1, 2, "persisted one");
        log.append(2, 1, "persisted two");

        let session = ChatSession::new(
            1,
            KeyPair::generate().unwrap(),
            log.clone(),
            RecordingSink::default(),
        );

        // a live message arriving before the first view is kept after history
        session.on_incoming(
            PlainEnvelope {
                sender_id: 2,
                receiver_id: 1,
                message: "live".into(),
            }
            .into(),
        );

        let first = session.load_history(2).await.unwrap();
        let texts: Vec<_> = first.iter().filter_map(|r| r.as_text()).collect();
        assert_eq!(texts, vec!["persisted one", "persisted two", "live"]);

        // later log writes are not re-fetched
        log.append(1, 2, "late");
        let second = session.load_history(2).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_history_failure_is_retryable() {
        let session = ChatSession::new(
            1,
            KeyPair::generate().unwrap(),
            BrokenLog,
            RecordingSink::default(),
        );
        assert!(matches!(
            session.load_history(2).await,
            Err(SessionError::Persistence(PersistenceError::Unavailable(_)))
        ));
        assert!(!session.cache().is_loaded(PairKey::new(1, 2)));
    }

    #[tokio::test]
    async fn test_close_cancels_history_load() {
        let session = Arc::new(ChatSession::new(
            1,
            KeyPair::generate().unwrap(),
            StalledLog,
            RecordingSink::default(),
        ));

        let loader = {
            let session = session.clone();
            tokio::spawn(async move { session.load_history(2).await })
        };
        tokio::task::yield_now().await;
        session.close();

        let result = loader.await.unwrap();
        assert!(matches!(result, Err(SessionError::Closed)));
        assert!(session.is_closed());
        assert!(matches!(
            session.load_history(3).await,
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_sends_all_cached() {
        let ((alice, sink), _) = pair();
        let alice = Arc::new(alice);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let alice = alice.clone();
                tokio::spawn(async move { alice.send_message(2, &i.to_string()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(alice.cached(2).len(), 16);
        assert_eq!(sink.published.lock().len(), 16);
    }
}
