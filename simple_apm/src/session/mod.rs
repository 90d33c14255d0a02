mod cookie;
mod errors;
mod store;
mod types;

pub use cookie::CookieIssuer;
pub use errors::SessionError;
pub use store::{InMemorySessionStore, SessionStore};
pub use types::{Session, SessionState};

pub(crate) use types::token_prefix;
