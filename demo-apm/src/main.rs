use std::sync::Arc;

use dotenvy::dotenv;

use simple_apm_axum::{Gateway, GatewayConfig, ReverseProxyForwarder, apm_router};

mod server;

use crate::server::{init_tracing, serve_http};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing(env!("CARGO_CRATE_NAME"));

    let config = GatewayConfig::from_env().inspect_err(|e| {
        tracing::error!("Refusing to start: {e}");
    })?;

    tracing::info!(
        port = config.port,
        backend = %config.proxied_service,
        cookie_ttl_secs = config.cookie_ttl_secs,
        confirm_policy = %config.confirm_policy,
        confirm_path = %config.confirm_path,
        denied_path = %config.denied_path,
        "Starting pre-authentication gateway"
    );

    let forwarder = ReverseProxyForwarder::new(config.proxied_service.clone())?;
    let port = config.port;
    let gateway = Arc::new(Gateway::in_memory(config));
    let app = apm_router(gateway, Arc::new(forwarder));

    serve_http(port, app).await.inspect_err(|e| {
        tracing::error!("HTTP server stopped: {e}");
    })?;
    Ok(())
}
