use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    #[error("Header error: {0}")]
    HeaderError(String),
}

impl SessionError {
    /// True when the random source failed; the process must stop serving.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Utils(UtilError::Crypto(_)))
    }
}
