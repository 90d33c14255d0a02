//! Per-request decision logic of the pre-authentication flow.
//!
//! [`Gateway`] is transport-agnostic: it reads request headers, consults the
//! [`SessionStore`] and returns a decision together with any `Set-Cookie`
//! headers. Turning decisions into HTTP responses and forwarding traffic is
//! left to the integration layer.

use std::sync::Arc;

use chrono::Utc;
use http::{HeaderMap, Method};

use crate::config::{ConfirmPolicy, GatewayConfig};
use crate::session::{
    CookieIssuer, InMemorySessionStore, Session, SessionError, SessionState, SessionStore,
    token_prefix,
};

/// Where the client is sent next, plus headers to attach to the redirect.
#[derive(Debug, Clone)]
pub struct Redirect {
    pub location: String,
    pub headers: HeaderMap,
}

impl Redirect {
    fn to(location: &str) -> Self {
        Self {
            location: location.to_string(),
            headers: HeaderMap::new(),
        }
    }
}

/// Outcome for a request hitting any path other than the confirmation and
/// denial routes.
#[derive(Debug, Clone)]
pub enum EntryDecision {
    /// A valid session is present; pass the request to the backend untouched.
    Forward(Session),
    /// A new session was issued; redirect to the confirmation route.
    Issue(Redirect),
}

pub struct Gateway {
    store: Arc<dyn SessionStore>,
    issuer: CookieIssuer,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(config: GatewayConfig, store: Arc<dyn SessionStore>, issuer: CookieIssuer) -> Self {
        Self {
            store,
            issuer,
            config,
        }
    }

    /// Gateway backed by a fresh in-memory store and the `MRHSession` cookie.
    pub fn in_memory(config: GatewayConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemorySessionStore::new()),
            CookieIssuer::default(),
        )
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Classifies the session cookie carried by `headers`.
    ///
    /// Only a malformed `Cookie` header is an error; a missing cookie is
    /// [`SessionState::NoCookie`].
    pub async fn classify(&self, headers: &HeaderMap) -> Result<SessionState, SessionError> {
        let token = self.issuer.token_from_headers(headers)?;
        let found = match token {
            Some(token) => self.store.lookup(token).await,
            None => None,
        };
        Ok(SessionState::classify(token, found, Utc::now()))
    }

    /// Proxy entry: forward valid sessions, issue a new one for everything else.
    ///
    /// Only the path of the request is recorded as the target; the query
    /// string is left behind.
    pub async fn handle_entry(
        &self,
        headers: &HeaderMap,
        path: &str,
    ) -> Result<EntryDecision, SessionError> {
        let state = self.classify(headers).await?;
        tracing::debug!(state = state.name(), path, "Proxy entry");

        match state {
            SessionState::ValidToken(session) => Ok(EntryDecision::Forward(session)),
            SessionState::ExpiredToken(expired) => {
                // Reclaim lazily; the replacement gets a new token anyway
                self.store.delete(&expired.token).await;
                self.issue(path).await
            }
            SessionState::NoCookie | SessionState::UnknownToken(_) => self.issue(path).await,
        }
    }

    /// Confirmation step: send the client back to what it originally asked for.
    pub async fn handle_confirm(
        &self,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<Redirect, SessionError> {
        if method != Method::GET {
            tracing::warn!(%method, "Non-GET request on the confirmation route");
            return Ok(Redirect::to(&self.config.denied_path));
        }

        let state = self.classify(headers).await?;
        tracing::debug!(state = state.name(), "Confirmation");

        match state {
            SessionState::NoCookie => Ok(Redirect::to("/")),
            SessionState::UnknownToken(token) => {
                tracing::debug!(token = token_prefix(&token), "Confirming unknown token");
                Ok(Redirect::to("/"))
            }
            SessionState::ExpiredToken(session) => Ok(Redirect::to(&target_of(&session))),
            SessionState::ValidToken(session) => match self.config.confirm_policy {
                ConfirmPolicy::Keep => Ok(Redirect::to(&target_of(&session))),
                ConfirmPolicy::Rotate => self.rotate(session).await,
            },
        }
    }

    async fn issue(&self, path: &str) -> Result<EntryDecision, SessionError> {
        let session = self.register(&redirect_target(path)).await?;
        tracing::debug!(
            token = session.token_prefix(),
            target_path = session.target_path.as_deref(),
            expires_at = %session.expires_at,
            "Issued session"
        );

        Ok(EntryDecision::Issue(Redirect {
            location: self.config.confirm_path.clone(),
            headers: self.issuer.set_cookie_headers(&session)?,
        }))
    }

    /// Creates a collision-free session in the store and records its target.
    async fn register(&self, target: &str) -> Result<Session, SessionError> {
        let session = self.store.create(self.config.cookie_ttl()).await?;
        self.store.set_target(&session.token, target).await;
        Ok(session.with_target(target))
    }

    /// Replaces a confirmed token with a fresh one pointing at the same target.
    ///
    /// Two confirmations racing on one token each mint their own replacement;
    /// the client keeps whichever cookie it saw last and the other replacement
    /// lingers until it expires.
    async fn rotate(&self, old: Session) -> Result<Redirect, SessionError> {
        let target = target_of(&old);
        self.store.delete(&old.token).await;

        let fresh = self.register(&target).await?;
        tracing::debug!(
            old = old.token_prefix(),
            new = fresh.token_prefix(),
            "Rotated session on confirmation"
        );

        Ok(Redirect {
            location: target,
            headers: self.issuer.set_cookie_headers(&fresh)?,
        })
    }
}

fn target_of(session: &Session) -> String {
    redirect_target(session.target_path.as_deref().unwrap_or("/"))
}

/// Reduces a request path to a same-origin redirect target.
///
/// Browsers read `//host` and `/\host` as references to another host, so a
/// leading run of slashes and backslashes collapses to a single `/`.
fn redirect_target(path: &str) -> String {
    format!("/{}", path.trim_start_matches(['/', '\\']))
}
