//! Captcha-gated admission for registration and login
//!
//! Each auth session holds at most one live [`CaptchaChallenge`]. A
//! challenge is single use: the first validation attempt clears it whether
//! or not the text matched, and an expired or missing challenge always
//! fails.

mod captcha;
mod password;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use uuid::Uuid;

pub use captcha::{render_svg, CAPTCHA_MIME_TYPE};
pub use password::{hash_password, verify_password, PasswordError};

/// Identifies one client's auth session
pub type SessionId = Uuid;

/// Characters a captcha may contain; glyphs that are easy to confuse are left out
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("captcha mismatch")]
    CaptchaMismatch,
    #[error("password error: {0}")]
    Password(#[from] PasswordError),
}

/// A freshly issued challenge: the text to type and its rendered image
#[derive(Debug, Clone)]
pub struct CaptchaChallenge {
    pub text: String,
    pub image: Vec<u8>,
}

#[derive(Debug)]
struct Challenge {
    text: String,
    issued_at: Instant,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    challenges: Arc<Mutex<HashMap<SessionId, Challenge>>>,
    ttl: Duration,
    length: usize,
}

impl AuthGate {
    pub fn new(ttl: Duration, length: usize) -> Self {
        Self {
            challenges: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            length: length.max(1),
        }
    }

    /// Bind a new challenge to `session`, replacing any earlier one
    pub fn issue_challenge(&self, session: SessionId) -> CaptchaChallenge {
        let text = random_text(self.length);
        let image = render_svg(&text);

        let mut challenges = self.challenges.lock();
        let ttl = self.ttl;
        challenges.retain(|_, c| c.issued_at.elapsed() < ttl);
        challenges.insert(
            session,
            Challenge {
                text: text.clone(),
                issued_at: Instant::now(),
            },
        );
        tracing::debug!(%session, "captcha issued");

        CaptchaChallenge { text, image }
    }

    /// Compare `submitted` against the session's challenge, ignoring case
    ///
    /// The challenge is consumed by this call regardless of the outcome.
    pub fn validate(&self, session: SessionId, submitted: &str) -> bool {
        let Some(challenge) = self.challenges.lock().remove(&session) else {
            tracing::debug!(%session, "captcha validation without a live challenge");
            return false;
        };
        if challenge.issued_at.elapsed() >= self.ttl {
            tracing::debug!(%session, "captcha expired");
            return false;
        }
        challenge.text.eq_ignore_ascii_case(submitted.trim())
    }

    /// [`Self::validate`] as a `Result`
    pub fn require(&self, session: SessionId, submitted: &str) -> Result<(), AuthError> {
        if self.validate(session, submitted) {
            Ok(())
        } else {
            Err(AuthError::CaptchaMismatch)
        }
    }

    /// Number of sessions currently holding a challenge
    pub fn pending(&self) -> usize {
        self.challenges.lock().len()
    }
}

fn random_text(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AuthGate {
        AuthGate::new(Duration::from_secs(300), 6)
    }

    #[tokio::test]
    async fn test_issue_shape() {
        let gate = gate();
        let challenge = gate.issue_challenge(Uuid::new_v4());
        assert_eq!(challenge.text.len(), 6);
        assert!(challenge.text.bytes().all(|b| ALPHABET.contains(&b)));
        assert!(std::str::from_utf8(&challenge.image)
            .unwrap()
            .starts_with("<svg"));
    }

    #[tokio::test]
    async fn test_image_cannot_be_read_back_as_answer() {
        let gate = gate();
        for _ in 0..20 {
            let session = Uuid::new_v4();
            let challenge = gate.issue_challenge(session);
            let svg = std::str::from_utf8(&challenge.image).unwrap();
            assert!(!svg.contains(&challenge.text));
            assert!(!svg.contains("<text"));
        }
    }

    #[tokio::test]
    async fn test_validate_is_case_insensitive() {
        let gate = gate();
        let session = Uuid::new_v4();
        let challenge = gate.issue_challenge(session);
        assert!(gate.validate(session, &challenge.text.to_lowercase()));
    }

    #[tokio::test]
    async fn test_challenge_is_one_shot() {
        let gate = gate();
        let session = Uuid::new_v4();
        let challenge = gate.issue_challenge(session);

        assert!(gate.validate(session, &challenge.text));
        assert!(!gate.validate(session, &challenge.text));
    }

    #[tokio::test]
    async fn test_failed_attempt_clears_challenge() {
        let gate = gate();
        let session = Uuid::new_v4();
        let challenge = gate.issue_challenge(session);

        assert!(!gate.validate(session, "wrong!"));
        assert!(!gate.validate(session, &challenge.text));
        assert_eq!(gate.pending(), 0);
    }

    #[tokio::test]
    async fn test_never_issued_fails_closed() {
        let gate = gate();
        assert!(!gate.validate(Uuid::new_v4(), "ANYTHING"));
        assert!(matches!(
            gate.require(Uuid::new_v4(), ""),
            Err(AuthError::CaptchaMismatch)
        ));
    }

    #[tokio::test]
    async fn test_reissue_replaces_prior_challenge() {
        let gate = gate();
        let session = Uuid::new_v4();
        let first = gate.issue_challenge(session);
        let second = gate.issue_challenge(session);
        assert_eq!(gate.pending(), 1);

        // only the latest text is live
        assert_eq!(
            gate.validate(session, &first.text),
            first.text == second.text
        );

        let third = gate.issue_challenge(session);
        assert!(gate.validate(session, &third.text));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let gate = gate();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let challenge_a = gate.issue_challenge(a);
        let challenge_b = gate.issue_challenge(b);

        assert!(gate.validate(b, &challenge_b.text));
        assert!(gate.validate(a, &challenge_a.text));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_challenge_fails() {
        let gate = AuthGate::new(Duration::from_secs(300), 6);
        let session = Uuid::new_v4();
        let challenge = gate.issue_challenge(session);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(!gate.validate(session, &challenge.text));
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_just_before_expiry() {
        let gate = AuthGate::new(Duration::from_secs(300), 6);
        let session = Uuid::new_v4();
        let challenge = gate.issue_challenge(session);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(gate.validate(session, &challenge.text));
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_prunes_expired_sessions() {
        let gate = AuthGate::new(Duration::from_secs(10), 6);
        gate.issue_challenge(Uuid::new_v4());
        gate.issue_challenge(Uuid::new_v4());

        tokio::time::advance(Duration::from_secs(11)).await;
        gate.issue_challenge(Uuid::new_v4());
        assert_eq!(gate.pending(), 1);
    }
}
