//! simple_apm_axum - Axum routes for the simple_apm gateway simulator
//!
//! Wires [`simple_apm::Gateway`] decisions to HTTP: `302 Found` redirects with
//! `Set-Cookie`, a plain-text denial page, and a streaming reverse proxy for
//! requests that carry a valid session.

mod error;
mod handlers;
mod proxy;
mod router;

pub use proxy::{Forwarder, ReverseProxyForwarder};
pub use router::{apm_router, apm_router_no_trace};

// Re-export the core types so applications need a single dependency
pub use simple_apm::{
    ConfigError, ConfirmPolicy, CookieIssuer, Gateway, GatewayConfig, InMemorySessionStore,
    SESSION_COOKIE_NAME, Session, SessionStore,
};
