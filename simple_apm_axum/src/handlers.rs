use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use http::header::{HeaderMap, HeaderValue, LOCATION};
use http::{Method, StatusCode};

use simple_apm::{EntryDecision, Gateway, HANGUP_BODY, Redirect};

use super::error::IntoResponseError;
use super::proxy::Forwarder;

#[derive(Clone)]
pub(crate) struct ApmState {
    pub(crate) gateway: Arc<Gateway>,
    pub(crate) forwarder: Arc<dyn Forwarder>,
}

/// Catch-all route: forward requests with a valid session, start the
/// handshake for everything else.
pub(crate) async fn proxy_entry(State(state): State<ApmState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let decision = state
        .gateway
        .handle_entry(&parts.headers, parts.uri.path())
        .await
        .into_response_error();

    match decision {
        Ok(EntryDecision::Forward(_)) => {
            let req = Request::from_parts(parts, body);
            state.forwarder.forward(req).await
        }
        Ok(EntryDecision::Issue(redirect)) => found(redirect),
        Err(e) => e.into_response(),
    }
}

/// Confirmation route
pub(crate) async fn my_policy(
    State(state): State<ApmState>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    match state
        .gateway
        .handle_confirm(&method, &headers)
        .await
        .into_response_error()
    {
        Ok(redirect) => found(redirect),
        Err(e) => e.into_response(),
    }
}

/// Denial route; same answer for every request.
pub(crate) async fn hangup() -> &'static str {
    HANGUP_BODY
}

/// `302 Found` carrying the decision's headers.
fn found(redirect: Redirect) -> Response {
    let location = match HeaderValue::from_str(&redirect.location) {
        Ok(location) => location,
        Err(e) => {
            tracing::error!("Invalid redirect location {:?}: {e}", redirect.location);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect location").into_response();
        }
    };

    let mut response = (StatusCode::FOUND, redirect.headers).into_response();
    response.headers_mut().insert(LOCATION, location);
    response
}
