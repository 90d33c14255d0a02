use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::session::errors::SessionError;
use crate::session::types::Session;

use super::types::{InMemorySessionStore, SessionStore};

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self {
            entries: Default::default(),
        }
    }

    /// Wraps already-built sessions, mostly for seeding tests.
    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let entries: HashMap<String, Session> = sessions
            .into_iter()
            .map(|s| (s.token.clone(), s))
            .collect();
        Self {
            entries: entries.into(),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, ttl: Duration) -> Result<Session, SessionError> {
        loop {
            // Mint outside the lock; the CSPRNG call is the slow part.
            let session = Session::mint(ttl)?;
            let mut entries = self.entries.write().await;
            if let Entry::Vacant(slot) = entries.entry(session.token.clone()) {
                slot.insert(session.clone());
                tracing::debug!(token = session.token_prefix(), "Session created");
                return Ok(session);
            }
            tracing::warn!("Token collision with a live session, drawing again");
        }
    }

    async fn insert(&self, session: Session) {
        tracing::debug!(token = session.token_prefix(), "Session registered");
        self.entries
            .write()
            .await
            .insert(session.token.clone(), session);
    }

    async fn set_target(&self, token: &str, path: &str) -> bool {
        match self.entries.write().await.get_mut(token) {
            Some(session) => {
                session.target_path = Some(path.to_string());
                true
            }
            None => false,
        }
    }

    async fn lookup(&self, token: &str) -> Option<Session> {
        self.entries.read().await.get(token).cloned()
    }

    async fn delete(&self, token: &str) -> Option<Session> {
        self.entries.write().await.remove(token)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
