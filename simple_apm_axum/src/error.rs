use http::StatusCode;
use simple_apm::SessionError;

/// Helper trait for converting errors to a standard response error format
pub(super) trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// Maps session failures to a status code and a plain-text diagnostic.
///
/// A failing random source means no token can be trusted anymore, so the
/// process is aborted instead of answering.
impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            if e.is_fatal() {
                tracing::error!("Cannot mint session tokens: {e}");
                std::process::abort();
            }
            let status = match e {
                SessionError::HeaderError(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::error!("Session error: {e}");
            (status, format!("Something went terribly wrong... {e}"))
        })
    }
}
