//! Shared fixtures: a recording backend and a gateway, both on ephemeral ports

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use simple_apm_axum::{Gateway, GatewayConfig, ReverseProxyForwarder, apm_router};
use tokio::net::TcpListener;

/// What the backend observed for one request
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct Backend {
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl Backend {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Initialize tracing once for the whole test binary
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

async fn record(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    backend.seen.lock().unwrap().push(SeenRequest {
        method: method.clone(),
        uri: uri.to_string(),
        headers,
        body,
    });

    if uri.path() == "/moved" {
        return (StatusCode::FOUND, [(header::LOCATION, "/elsewhere")]).into_response();
    }

    // Names a per-hop header through Connection
    if uri.path() == "/hop" {
        return (
            [
                ("connection", "x-hop"),
                ("x-hop", "backend-only"),
                ("x-backend", "yes"),
            ],
            "hop",
        )
            .into_response();
    }

    (
        [("x-backend", "yes")],
        format!("backend saw {method} {uri}"),
    )
        .into_response()
}

pub async fn spawn_backend() -> (SocketAddr, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .fallback(record)
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

/// Starts the gateway in front of `backend_addr` and returns its address
pub async fn spawn_gateway(
    backend_addr: SocketAddr,
    config: GatewayConfig,
) -> (SocketAddr, Arc<Gateway>) {
    init_test_tracing();

    let config = GatewayConfig {
        proxied_service: format!("http://{backend_addr}").parse().unwrap(),
        ..config
    };
    let forwarder = ReverseProxyForwarder::new(config.proxied_service.clone()).unwrap();
    let gateway = Arc::new(Gateway::in_memory(config));
    let app = apm_router(gateway.clone(), Arc::new(forwarder));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (addr, gateway)
}

/// HTTP client that reports redirects instead of following them
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.split(';').next()?.strip_prefix("MRHSession="))
        .map(str::to_string)
}
