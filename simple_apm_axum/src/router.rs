//! Router exposing the gateway's three routes

use std::sync::Arc;

use axum::Router;
use axum::routing::any;
use simple_apm::Gateway;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers::{ApmState, hangup, my_policy, proxy_entry};
use super::proxy::Forwarder;

/// Create the gateway router
///
/// - `{confirm_path}` (default `/my.policy`): confirmation step, any method
/// - `{denied_path}` (default `/vdesk/hangup.php3`): denial page, any method
/// - everything else: proxy entry
///
/// Paths come from the gateway's configuration.
pub fn apm_router(gateway: Arc<Gateway>, forwarder: Arc<dyn Forwarder>) -> Router {
    apm_router_no_trace(gateway, forwarder).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as `apm_router()` without the HTTP tracing middleware.
pub fn apm_router_no_trace(gateway: Arc<Gateway>, forwarder: Arc<dyn Forwarder>) -> Router {
    let confirm_path = gateway.config().confirm_path.clone();
    let denied_path = gateway.config().denied_path.clone();

    Router::new()
        .route(&confirm_path, any(my_policy))
        .route(&denied_path, any(hangup))
        .fallback(proxy_entry)
        .with_state(ApmState { gateway, forwarder })
}
