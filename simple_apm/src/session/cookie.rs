use chrono::Duration;
use http::header::{COOKIE, HeaderMap};

use crate::config::SESSION_COOKIE_NAME;
use crate::session::errors::SessionError;
use crate::session::types::Session;
use crate::utils::header_set_cookie;

/// Builds and reads the `MRHSession` cookie.
///
/// Issuing does not register anything; the caller stores the returned
/// session and attaches the headers to its response.
#[derive(Debug, Clone)]
pub struct CookieIssuer {
    cookie_name: String,
    cookie_path: String,
}

impl Default for CookieIssuer {
    fn default() -> Self {
        Self::new(SESSION_COOKIE_NAME)
    }
}

impl CookieIssuer {
    pub fn new(cookie_name: &str) -> Self {
        Self {
            cookie_name: cookie_name.to_string(),
            cookie_path: "/".to_string(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Mints a token valid for `ttl` and the `Set-Cookie` header announcing it.
    pub fn issue(&self, ttl: Duration) -> Result<(HeaderMap, Session), SessionError> {
        let session = Session::mint(ttl)?;
        let headers = self.set_cookie_headers(&session)?;
        Ok((headers, session))
    }

    /// `Set-Cookie` header for an existing session.
    pub fn set_cookie_headers(&self, session: &Session) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        header_set_cookie(
            &mut headers,
            &self.cookie_name,
            &session.token,
            session.expires_at,
            &self.cookie_path,
        )?;
        Ok(headers)
    }

    /// Finds the session token among the request cookies.
    ///
    /// A missing cookie is `Ok(None)`. Pairs that are not visible ASCII are
    /// skipped unless they carry the session cookie, which is then an error.
    pub fn token_from_headers<'a>(
        &self,
        headers: &'a HeaderMap,
    ) -> Result<Option<&'a str>, SessionError> {
        for cookie_header in headers.get_all(COOKIE) {
            for pair in cookie_header.as_bytes().split(|b| *b == b';') {
                let Some(eq) = pair.iter().position(|b| *b == b'=') else {
                    continue;
                };
                if pair[..eq].trim_ascii() != self.cookie_name.as_bytes() {
                    continue;
                }

                let value = std::str::from_utf8(pair[eq + 1..].trim_ascii())
                    .ok()
                    .filter(|v| v.bytes().all(|b| b.is_ascii_graphic()))
                    .ok_or_else(|| {
                        tracing::error!("Invalid '{}' cookie value", self.cookie_name);
                        SessionError::HeaderError("Invalid session cookie value".to_string())
                    })?;
                return Ok(Some(value.trim_matches('"')));
            }
        }

        tracing::debug!("No session cookie '{}' found in cookies", self.cookie_name);
        Ok(None)
    }
}
