//! HTTP transport contract and the reqwest-backed production implementation.
//!
//! # Design
//! The service core never touches the network directly. It hands a fully
//! built [`HttpRequest`] to a [`Transport`] and gets back an [`HttpResponse`]
//! (any status, raw body bytes) or a [`TransportError`]. The seam does no
//! status interpretation and no retrying, so every outcome decision lives in
//! one place (`service`) and unit tests can script the transport freely.
//!
//! Descriptors can attach an opaque delegate that rides along untouched.
//! [`ReqwestTransport`] understands [`SessionOverride`] and ignores anything
//! else; other transports define their own hook types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use http::StatusCode;
use thiserror::Error;
use url::Url;

/// HTTP method for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// Opaque per-call hook forwarded to the transport untouched.
///
/// The service never inspects the value. Each transport downcasts to the
/// concrete hook types it honors and ignores the rest.
pub type TransportDelegate = dyn Any + Send + Sync;

/// A fully built HTTP request, ready for a [`Transport`] to execute.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// When set, the transport must not answer from any local HTTP cache.
    pub bypass_cache: bool,
    pub delegate: Option<Arc<TransportDelegate>>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("bypass_cache", &self.bypass_cache)
            .field("delegate", &self.delegate.is_some())
            .finish()
    }
}

/// An HTTP response as raw data: status, headers, body bytes.
///
/// No interpretation happens at this level. The descriptor's cached-payload
/// lookup receives this value when the status is `304 Not Modified`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Failures a transport can report.
///
/// Variants carry plain text rather than source errors so the seam stays
/// transport-agnostic and scripted test transports can fabricate every case.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange was cancelled before a response arrived. Futures-based
    /// transports usually cancel by being dropped instead; this variant is
    /// for transports that surface cancellation as an event.
    #[error("request cancelled")]
    Cancelled,

    /// Connection, TLS, timeout, protocol, or body-read failure.
    #[error("network failure: {0}")]
    Network(String),

    /// A failure that fits no recognized transport category.
    #[error("{0}")]
    Other(String),
}

/// Executes one HTTP exchange.
///
/// Implementations report every response as data, whatever the status code;
/// only transport-level breakage becomes an error.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Per-call session override honored by [`ReqwestTransport`].
///
/// Attach one as the descriptor's transport delegate when a request needs a
/// specially configured client: custom TLS trust, a proxy, default headers.
#[derive(Debug, Clone)]
pub struct SessionOverride {
    pub client: reqwest::Client,
}

/// Production transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client instead of the default one.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn client_for(&self, request: &HttpRequest) -> reqwest::Client {
        request
            .delegate
            .as_deref()
            .and_then(|delegate| delegate.downcast_ref::<SessionOverride>())
            .map(|session| session.client.clone())
            .unwrap_or_else(|| self.client.clone())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(&request);
        let mut headers = request.headers;
        if request.bypass_cache {
            // reqwest keeps no local cache; still tell shared caches to revalidate.
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }
        let mut builder = client.request(request.method.into(), request.url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builder-stage errors are not network events; everything else is.
fn classify(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::Other(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}
