//! Reverse proxy connector for a single fixed upstream origin.
//!
//! The connector relays method, headers and body to the upstream and hands
//! the upstream response to a [`ResponseSink`]. [`StreamThrough`] turns it
//! into a live client response; [`Capture`] buffers it for inspection.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{
    body::{Body, HttpBody},
    extract::ConnectInfo,
    response::Response,
};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::{
    constants::{headers, HOP_BY_HOP_HEADERS},
    errors::{AppError, GatewayError},
    utils::protocol::{origin_string, parse_origin},
};

/// Where an upstream response ends up.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    type Output: Send;

    async fn deliver(&self, upstream: reqwest::Response) -> Result<Self::Output, AppError>;
}

/// Relays the upstream body to the client chunk by chunk.
pub struct StreamThrough;

/// Buffers the full upstream response.
pub struct Capture;

/// An upstream response held in memory.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedResponse {
    /// Builds the client response, recomputing `Content-Length` for `body`.
    pub fn into_response_with_body(self, body: Bytes) -> Response {
        let length = body.len();
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        response
    }

    pub fn into_response(self) -> Response {
        let body = self.body.clone();
        self.into_response_with_body(body)
    }
}

#[async_trait]
impl ResponseSink for StreamThrough {
    type Output = Response;

    async fn deliver(&self, upstream: reqwest::Response) -> Result<Response, AppError> {
        let status = upstream.status();
        let headers = relay_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait]
impl ResponseSink for Capture {
    type Output = CapturedResponse;

    async fn deliver(&self, upstream: reqwest::Response) -> Result<CapturedResponse, AppError> {
        let status = upstream.status();
        let headers = relay_headers(upstream.headers());
        let body = upstream.bytes().await?;

        Ok(CapturedResponse { status, headers, body })
    }
}

/// Forwards requests to one `scheme://host[:port]`.
#[derive(Debug, Clone)]
pub struct ReverseProxyConnector {
    origin: Url,
    client: Client,
}

impl ReverseProxyConnector {
    /// Binds a connector to an upstream reference such as `users:3000` or
    /// `https://api.example.com`.
    pub fn new(upstream: &str, client: Client) -> Result<Self, GatewayError> {
        let origin = parse_origin(upstream)
            .ok_or_else(|| GatewayError::InvalidUpstream(upstream.to_string()))?;
        Ok(Self { origin, client })
    }

    pub fn scheme(&self) -> &str {
        self.origin.scheme()
    }

    /// `host[:port]` of the upstream.
    pub fn host(&self) -> String {
        match self.origin.port() {
            Some(port) => format!("{}:{}", self.origin.host_str().unwrap_or_default(), port),
            None => self.origin.host_str().unwrap_or_default().to_string(),
        }
    }

    pub fn origin(&self) -> String {
        origin_string(&self.origin)
    }

    /// Full upstream URL for a retargeted path and query.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.origin(), path, q),
            _ => format!("{}{}", self.origin(), path),
        }
    }

    /// Sends `req` to `target` (see [`Self::target_url`]) and delivers the
    /// upstream response into `sink`.
    ///
    /// Method, headers and body are preserved; the body is streamed, never
    /// buffered. Hop-by-hop headers are dropped and the client address is
    /// appended to `X-Forwarded-For`.
    pub async fn forward<S: ResponseSink>(
        &self,
        req: Request<Body>,
        target: &str,
        timeout: Option<std::time::Duration>,
        sink: &S,
    ) -> Result<S::Output, AppError> {
        let (parts, body) = req.into_parts();

        let mut outbound_headers = relay_headers(&parts.headers);
        outbound_headers.remove(header::HOST);
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(&mut outbound_headers, addr);
        }

        info!(destination = %target, method = %parts.method, "Forwarding request to upstream");

        let mut request = self
            .client
            .request(parts.method, target)
            .headers(outbound_headers);
        if body.size_hint().exact() != Some(0) {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let upstream = request.send().await?;
        sink.deliver(upstream).await
    }
}

/// Copies `headers` without hop-by-hop entries or anything `Connection` names.
fn relay_headers(headers: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .collect();

    let mut relayed = headers.clone();
    for name in HOP_BY_HOP_HEADERS.iter().copied().chain(connection_listed.iter().map(String::as_str)) {
        relayed.remove(name);
    }
    relayed
}

fn append_forwarded_for(map: &mut HeaderMap, addr: &SocketAddr) {
    let client_ip = addr.ip().to_string();
    let value = match map.get(headers::FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client_ip),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        map.insert(headers::FORWARDED_FOR, value);
    }
}
