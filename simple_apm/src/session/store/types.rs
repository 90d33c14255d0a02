use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::session::errors::SessionError;
use crate::session::types::Session;

/// Process-wide token registry.
///
/// Each method is atomic on its own. There is no per-session locking: two
/// requests carrying the same token may interleave, and the last write wins.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Mint a new token expiring `ttl` from now and register it without a target.
    /// Fails only when the random source is unavailable.
    async fn create(&self, ttl: Duration) -> Result<Session, SessionError>;

    /// Register a session minted elsewhere, replacing any entry with the same token.
    async fn insert(&self, session: Session);

    /// Record the path requested at issuance. Returns false for unknown tokens.
    async fn set_target(&self, token: &str, path: &str) -> bool;

    /// Return the stored session, expired or not. Expiry is the caller's check.
    async fn lookup(&self, token: &str) -> Option<Session>;

    /// Remove a session, returning it if it was present.
    async fn delete(&self, token: &str) -> Option<Session>;

    /// Number of registered sessions, expired entries included.
    async fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    pub(super) entries: RwLock<HashMap<String, Session>>,
}
