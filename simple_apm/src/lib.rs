//! simple_apm - Pre-authentication redirect flow of an access-policy gateway
//!
//! This crate holds the state that decides, per request, whether a client is
//! issued a fresh `MRHSession` cookie, sent back to the resource it asked for,
//! forwarded to the protected backend, or diverted to the denial page. It has
//! no HTTP server of its own; see the `simple-apm-axum` crate for the routes.

mod config;
mod gateway;
mod session;
mod utils;

pub use config::{
    ConfigError, ConfirmPolicy, DEFAULT_CONFIRM_PATH, DEFAULT_COOKIE_TTL_SECS,
    DEFAULT_DENIED_PATH, DEFAULT_PORT, DEFAULT_PROXIED_SERVICE, GatewayConfig, HANGUP_BODY,
    MAX_COOKIE_TTL_SECS, SESSION_COOKIE_NAME,
};
pub use gateway::{EntryDecision, Gateway, Redirect};
pub use session::{
    CookieIssuer, InMemorySessionStore, Session, SessionError, SessionState, SessionStore,
};
pub use utils::{UtilError, gen_random_hex};
