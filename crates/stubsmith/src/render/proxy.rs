use super::RenderError;
use crate::metrics;
use crate::model::{HttpHeader, HttpHeaders, Response, ServedEvent};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Renders a response by forwarding the request elsewhere
#[async_trait]
pub trait ProxyResponseRenderer: Send + Sync {
    async fn render(&self, event: &ServedEvent) -> Result<Response, RenderError>;
}

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_forwardable(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !HOP_BY_HOP_HEADERS.contains(&lower.as_str()) && lower != "host" && lower != "content-length"
}

#[derive(Debug, thiserror::Error)]
#[error("Response definition has no proxy target")]
struct MissingProxyTarget;

/// Forwards requests to `proxyBaseUrl` with reqwest
#[derive(Debug, Clone)]
pub struct UpstreamProxyRenderer {
    client: reqwest::Client,
}

impl UpstreamProxyRenderer {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProxyResponseRenderer for UpstreamProxyRenderer {
    async fn render(&self, event: &ServedEvent) -> Result<Response, RenderError> {
        let target = event
            .response_definition
            .proxy_target()
            .ok_or_else(|| RenderError::proxy(MissingProxyTarget))?;
        let request = &event.request;

        let url = format!("{}{}", target.base_url.trim_end_matches('/'), request.url);
        let method =
            reqwest::Method::from_bytes(request.method.as_bytes()).map_err(RenderError::proxy)?;
        debug!(method = %method, url = %url, "Forwarding request upstream");

        let mut upstream = self.client.request(method, &url);
        for header in request
            .headers
            .iter()
            .chain(target.additional_request_headers.iter())
        {
            if !is_forwardable(&header.key) {
                continue;
            }
            for value in &header.values {
                upstream = upstream.header(header.key.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            upstream = upstream.body(request.body.clone());
        }

        let start = Instant::now();
        let upstream = upstream.send().await.map_err(RenderError::proxy)?;
        let status = upstream.status().as_u16();

        let mut headers = HttpHeaders::new();
        for (name, value) in upstream.headers() {
            if !is_forwardable(name.as_str()) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                headers.push(HttpHeader::new(name.as_str(), value));
            }
        }
        let body = upstream.bytes().await.map_err(RenderError::proxy)?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::record_upstream_duration(&request.method, status, elapsed_ms);
        debug!(status, elapsed_ms, "Upstream responded");

        Ok(Response::builder()
            .status(status)
            .headers(headers)
            .body(body)
            .from_proxy(true)
            .build())
    }
}
