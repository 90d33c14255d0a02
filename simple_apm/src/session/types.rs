use chrono::{DateTime, Duration, Utc};

use crate::session::errors::SessionError;
use crate::utils::{SESSION_TOKEN_BYTES, gen_random_hex};

/// One in-progress or completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 64 lowercase hex characters backed by 32 bytes from the OS CSPRNG
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Path requested when the session was issued; the confirmation step redirects here
    pub target_path: Option<String>,
}

impl Session {
    /// Mints a fresh token expiring `ttl` from now. Nothing is registered.
    pub(crate) fn mint(ttl: Duration) -> Result<Self, SessionError> {
        let token = gen_random_hex(SESSION_TOKEN_BYTES)?;
        Ok(Self {
            token,
            expires_at: Utc::now() + ttl,
            target_path: None,
        })
    }

    pub fn with_target(mut self, path: &str) -> Self {
        self.target_path = Some(path.to_string());
        self
    }

    /// A session is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }

    /// Shortened token for log lines; the full value is the only credential.
    pub fn token_prefix(&self) -> &str {
        token_prefix(&self.token)
    }
}

pub(crate) fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Per-request classification of the `MRHSession` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoCookie,
    UnknownToken(String),
    ExpiredToken(Session),
    ValidToken(Session),
}

impl SessionState {
    pub fn classify(token: Option<&str>, found: Option<Session>, now: DateTime<Utc>) -> Self {
        match (token, found) {
            (None, _) => SessionState::NoCookie,
            (Some(token), None) => SessionState::UnknownToken(token.to_string()),
            (Some(_), Some(session)) if session.is_valid_at(now) => {
                SessionState::ValidToken(session)
            }
            (Some(_), Some(session)) => SessionState::ExpiredToken(session),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NoCookie => "no_cookie",
            SessionState::UnknownToken(_) => "unknown_token",
            SessionState::ExpiredToken(_) => "expired_token",
            SessionState::ValidToken(_) => "valid_token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session {
            token: "a".repeat(64),
            expires_at,
            target_path: Some("/reports/q3".to_string()),
        }
    }

    #[test]
    fn test_mint_sets_expiry_after_now() {
        let before = Utc::now();
        let session = Session::mint(Duration::seconds(360)).unwrap();

        assert_eq!(session.token.len(), 64);
        assert!(session.expires_at >= before + Duration::seconds(360));
        assert!(session.expires_at <= Utc::now() + Duration::seconds(360));
        assert!(session.target_path.is_none());
        assert!(!session.is_expired());
    }

    #[test]
    fn test_validity_boundary() {
        // Given a session expiring at a fixed instant
        let now = Utc::now();
        let session = session_expiring_at(now);

        // Then it is valid just before, and invalid at and after that instant
        assert!(session.is_valid_at(now - Duration::milliseconds(1)));
        assert!(!session.is_valid_at(now));
        assert!(!session.is_valid_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_token_prefix() {
        let session = session_expiring_at(Utc::now());
        assert_eq!(session.token_prefix(), "aaaaaaaa");
        assert_eq!(token_prefix("abc"), "abc");
    }

    #[test]
    fn test_classify_states() {
        let now = Utc::now();
        let valid = session_expiring_at(now + Duration::seconds(10));
        let expired = session_expiring_at(now - Duration::seconds(10));

        assert_eq!(SessionState::classify(None, None, now), SessionState::NoCookie);
        assert_eq!(
            SessionState::classify(Some("deadbeef"), None, now),
            SessionState::UnknownToken("deadbeef".to_string())
        );
        assert_eq!(
            SessionState::classify(Some(&valid.token), Some(valid.clone()), now),
            SessionState::ValidToken(valid)
        );
        assert_eq!(
            SessionState::classify(Some(&expired.token), Some(expired.clone()), now),
            SessionState::ExpiredToken(expired)
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::NoCookie.name(), "no_cookie");
        assert_eq!(
            SessionState::UnknownToken(String::new()).name(),
            "unknown_token"
        );
    }
}
