use axum::Router;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Serves `app` on all interfaces until the listener fails.
///
/// Connection info is attached so the proxy can fill `X-Forwarded-For`.
pub(crate) async fn serve_http(port: u16, app: Router) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

pub(crate) fn init_tracing(app_name: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            format!("simple_apm_axum=trace,simple_apm=trace,{app_name}=trace,tower_http=debug,info")
                .into()
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = app_name;
            "info".into()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    #[cfg(debug_assertions)]
    tracing::info!("Debug mode enabled - showing detailed logs by default");
    tracing::info!("You can increase verbosity by setting the RUST_LOG environment variable.");
    tracing::info!("Example: RUST_LOG=debug ./demo-apm");
}
