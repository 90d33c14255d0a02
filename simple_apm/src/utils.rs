use chrono::{DateTime, Utc};
use http::header::{HeaderMap, SET_COOKIE};
use ring::rand::SecureRandom;
use thiserror::Error;

/// Number of random bytes behind every session token (hex doubles the length)
pub(crate) const SESSION_TOKEN_BYTES: usize = 32;

/// Draws `len` bytes from the operating system CSPRNG and hex-encodes them.
pub fn gen_random_hex(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;
    Ok(hex::encode(bytes))
}

/// Formats a timestamp the way the `Expires` cookie attribute expects it
/// (IMF-fixdate, always GMT).
pub(crate) fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(crate) fn header_set_cookie<'a>(
    headers: &'a mut HeaderMap,
    name: &str,
    value: &str,
    expires_at: DateTime<Utc>,
    path: &str,
) -> Result<&'a HeaderMap, UtilError> {
    let cookie = format!(
        "{name}={value}; Path={path}; Expires={}",
        http_date(expires_at)
    );
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(headers)
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),
}
