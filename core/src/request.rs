//! Request descriptors: what to fetch and how to resolve a cached copy.
//!
//! # Design
//! [`NetworkRequest`] is the caller-facing contract. Everything except the
//! URL has a default, so the minimal descriptor is one method. Richer callers
//! override what they need: a method and body, extra headers, a cache
//! validator plus the lookup that resolves it on a 304, or a transport
//! delegate for session-level hooks. Descriptors are read-only during a fire
//! and may be fired any number of times.

use std::sync::Arc;

use bytes::Bytes;
use http::header::HeaderMap;

use crate::transport::{HttpMethod, HttpResponse, TransportDelegate};

/// One HTTP request and the caller-side capabilities attached to it.
pub trait NetworkRequest: Send + Sync {
    /// Target URL. A leading `http://` is upgraded to `https://` at fire
    /// time; everything after the scheme is taken verbatim.
    fn url(&self) -> &str;

    /// HTTP method; GET when not overridden.
    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    /// Request body, if any.
    fn body(&self) -> Option<Bytes> {
        None
    }

    /// Cache validator (entity tag), echoed as `If-None-Match` unless the
    /// fire call suppresses it.
    fn etag(&self) -> Option<String> {
        None
    }

    /// Additional headers copied onto the request. The fixed `Accept` policy
    /// and an attached validator win over entries given here.
    fn extra_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// Opaque per-call hook handed to the transport untouched.
    fn transport_delegate(&self) -> Option<Arc<TransportDelegate>> {
        None
    }

    /// Locally cached payload for a response the server answered with
    /// `304 Not Modified`.
    ///
    /// Consulted only on a 304. `Some` resolves the fire with those bytes;
    /// `None` triggers exactly one validator-free refetch. May run again on
    /// later fires of the same descriptor, so it must be idempotent.
    fn cached_payload(&self, _response: &HttpResponse) -> Option<Bytes> {
        None
    }
}

/// Minimal descriptor: a bare GET of one URL, nothing else attached.
#[derive(Debug, Clone)]
pub struct BareRequest {
    url: String,
}

impl BareRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl NetworkRequest for BareRequest {
    fn url(&self) -> &str {
        &self.url
    }
}
