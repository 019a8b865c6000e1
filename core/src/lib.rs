//! Single-shot HTTP request execution with conditional-cache semantics.
//!
//! # Overview
//! A descriptor ([`NetworkRequest`]) says what to fetch: URL, method, body,
//! extra headers, an optional cache validator and the lookup that resolves
//! it. [`NetworkService::fire`] normalizes the URL (upgrading a leading plain
//! `http://` to `https://`), dispatches through a [`Transport`], and
//! classifies the answer into payload bytes or a [`NetworkError`]. A
//! `304 Not Modified` is resolved against the descriptor's cached payload,
//! with one transparent validator-free refetch when nothing is cached.
//!
//! # Design
//! - `NetworkService` is stateless per call; clones share one transport.
//! - The async `fire` body is the only implementation; the callback forms
//!   spawn the same future.
//! - The transport seam is a trait, so tests script exchanges without
//!   sockets. [`ReqwestTransport`] is the production implementation.
//! - Payloads stay opaque [`bytes::Bytes`] end to end; nothing here parses
//!   bodies.
//!
//! A transport that reports cancellation resolves as
//! [`NetworkError::NoData`], deliberately indistinguishable from a transport
//! failure. Dropping the future (or aborting a callback-form task) abandons
//! the call without a callback.

pub mod error;
pub mod request;
pub mod service;
pub mod transport;

pub use error::{NetworkError, Outcome};
pub use request::{BareRequest, NetworkRequest};
pub use service::NetworkService;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, SessionOverride, Transport,
    TransportDelegate, TransportError,
};
