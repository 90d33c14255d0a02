//! Forwarding of authorized requests to the protected backend

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::response::{IntoResponse, Response};
use http::header::{self, HeaderMap, HeaderValue};
use http::{StatusCode, Uri};
use url::Url;

/// Headers that describe a single connection and must not cross the proxy
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Hands an authorized request to the backend and returns its response.
///
/// Implementations must not fail: backend trouble is reported to the client
/// as a response (typically `502 Bad Gateway`).
#[async_trait]
pub trait Forwarder: Send + Sync + 'static {
    async fn forward(&self, req: Request) -> Response;
}

/// Single-host reverse proxy streaming bodies in both directions.
///
/// The backend request lives inside the handler future, so a client that
/// disconnects drops it together with any response body still streaming.
#[derive(Debug, Clone)]
pub struct ReverseProxyForwarder {
    client: reqwest::Client,
    backend: Url,
}

impl ReverseProxyForwarder {
    pub fn new(backend: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client, backend })
    }

    pub fn backend(&self) -> &Url {
        &self.backend
    }

    /// Backend base URL with the request path appended and the query replaced.
    pub(crate) fn upstream_url(&self, uri: &Uri) -> Url {
        let mut url = self.backend.clone();
        url.set_path(&join_paths(self.backend.path(), uri.path()));
        url.set_query(uri.query());
        url
    }
}

#[async_trait]
impl Forwarder for ReverseProxyForwarder {
    async fn forward(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let url = self.upstream_url(&parts.uri);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(&mut headers, *addr);
        }

        tracing::debug!(method = %parts.method, %url, "Forwarding to backend");

        let upstream = self
            .client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await;

        match upstream {
            Ok(resp) => {
                let status = resp.status();
                let mut headers = resp.headers().clone();
                strip_hop_by_hop(&mut headers);

                let mut response = Response::new(Body::from_stream(resp.bytes_stream()));
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            Err(e) => {
                tracing::error!(%url, "Backend request failed: {e}");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }
}

/// Joins two path segments with exactly one slash at the seam.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Connection may name further per-hop headers
    let named: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &named {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, client: SocketAddr) {
    let ip = client.ip().to_string();
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        ip
    } else {
        format!("{}, {ip}", prior.join(", "))
    };

    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR, value);
        }
        Err(_) => tracing::warn!("Could not build X-Forwarded-For header"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(backend: &str) -> ReverseProxyForwarder {
        ReverseProxyForwarder::new(Url::parse(backend).unwrap()).unwrap()
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/dashboard"), "/dashboard");
        assert_eq!(join_paths("/app", "/dashboard"), "/app/dashboard");
        assert_eq!(join_paths("/app/", "/dashboard"), "/app/dashboard");
        assert_eq!(join_paths("/app", "dashboard"), "/app/dashboard");
        assert_eq!(join_paths("/app/", "dashboard"), "/app/dashboard");
    }

    #[test]
    fn test_upstream_url_keeps_path_and_query() {
        let forwarder = forwarder("http://localhost:8081");
        let uri: Uri = "/reports/q3?format=csv&page=2".parse().unwrap();

        let url = forwarder.upstream_url(&uri);

        assert_eq!(
            url.as_str(),
            "http://localhost:8081/reports/q3?format=csv&page=2"
        );
    }

    #[test]
    fn test_upstream_url_with_base_path() {
        let forwarder = forwarder("https://backend.internal:8443/app/?stale=1");
        let uri: Uri = "/dashboard".parse().unwrap();

        let url = forwarder.upstream_url(&uri);

        // The backend's own query is replaced by the request's (absent here)
        assert_eq!(url.as_str(), "https://backend.internal:8443/app/dashboard");
        assert_eq!(forwarder.backend().path(), "/app/");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, X-Trace-Hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-trace-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::COOKIE, HeaderValue::from_static("MRHSession=abc"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key(header::COOKIE));
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_append_forwarded_for() {
        let client: SocketAddr = "192.0.2.7:51000".parse().unwrap();

        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, client);
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "192.0.2.7");

        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.1"));
        append_forwarded_for(&mut headers, client);
        assert_eq!(
            headers.get(X_FORWARDED_FOR).unwrap(),
            "203.0.113.1, 192.0.2.7"
        );
    }
}
