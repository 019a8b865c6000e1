//! Request execution: normalize, dispatch, classify, retry once on a stale
//! validator.
//!
//! # Design
//! `NetworkService` holds only the shared transport; each fire is
//! independent. The async [`fire`](NetworkService::fire) body is the single
//! implementation; the callback forms spawn that same future and hand the
//! outcome to a closure, so the two call styles cannot drift apart.
//!
//! Outcome mapping:
//! - transport error or cancellation: [`NetworkError::NoData`]
//! - unclassified transport failure: [`NetworkError::Custom`]
//! - status outside 200-299 and not 304: [`NetworkError::ServerFailure`]
//! - 304 with a cached payload: success with those bytes, no refetch
//! - 304 without one: one refetch with the validator suppressed
//! - 200-299: success with the raw body
//!
//! Every branch emits a `tracing` event tagged with the request URL.

use std::sync::Arc;

use http::header::{HeaderValue, ACCEPT, IF_NONE_MATCH};
use http::StatusCode;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

use crate::error::{NetworkError, Outcome};
use crate::request::{BareRequest, NetworkRequest};
use crate::transport::{HttpRequest, ReqwestTransport, Transport, TransportError};

/// Content negotiation is fixed: every request announces the same `Accept`.
const ACCEPT_VALUE: &str = "application/json; charset=utf-8";

/// Result of one dispatch attempt: either final, or "go again without the
/// validator" after a 304 the descriptor could not resolve from cache.
enum Attempt {
    Resolved(Outcome),
    RetryWithoutValidator,
}

/// Executes request descriptors against a [`Transport`] and classifies what
/// comes back.
#[derive(Debug, Clone)]
pub struct NetworkService {
    transport: Arc<dyn Transport>,
}

impl NetworkService {
    /// Service over the default reqwest-backed transport.
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    /// Service over a caller-provided transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Execute `request` and await its outcome.
    ///
    /// With `ignore_etag = false` an available validator is attached as
    /// `If-None-Match`; `true` forces an unconditional fetch. A 304 answer is
    /// resolved through the descriptor's cached payload, falling back to
    /// exactly one unconditional refetch when nothing is cached.
    pub async fn fire<R>(&self, request: &R, ignore_etag: bool) -> Outcome
    where
        R: NetworkRequest + ?Sized,
    {
        let mut ignore_etag = ignore_etag;
        loop {
            match self.fire_once(request, ignore_etag).await {
                Attempt::Resolved(outcome) => return outcome,
                // Only reachable while a validator is attached, so the next
                // pass is the last one.
                Attempt::RetryWithoutValidator => ignore_etag = true,
            }
        }
    }

    /// Bare GET of `url`; shorthand for firing a [`BareRequest`].
    pub async fn fire_url(&self, url: &str, ignore_etag: bool) -> Outcome {
        self.fire(&BareRequest::new(url), ignore_etag).await
    }

    /// Callback form of [`fire`](Self::fire): runs the same future on the
    /// ambient tokio runtime and hands the outcome to `on_complete`.
    ///
    /// Must be called within a tokio runtime. Aborting the returned handle
    /// abandons the call and `on_complete` never runs.
    pub fn fire_with<R, F>(&self, request: R, ignore_etag: bool, on_complete: F) -> JoinHandle<()>
    where
        R: NetworkRequest + 'static,
        F: FnOnce(Outcome) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move {
            let outcome = service.fire(&request, ignore_etag).await;
            on_complete(outcome);
        })
    }

    /// Callback form of [`fire_url`](Self::fire_url).
    pub fn fire_url_with<F>(&self, url: &str, ignore_etag: bool, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        self.fire_with(BareRequest::new(url), ignore_etag, on_complete)
    }

    async fn fire_once<R>(&self, request: &R, ignore_etag: bool) -> Attempt
    where
        R: NetworkRequest + ?Sized,
    {
        let raw_url = request.url();
        info!(url = raw_url, "creating request");

        let url = match normalize_url(raw_url) {
            Ok(url) => url,
            Err(cause) => {
                error!(url = raw_url, cause = %cause, "failed to create request");
                return Attempt::Resolved(Err(NetworkError::InvalidUrl(raw_url.to_string())));
            }
        };

        let (wire, conditional) = build_request(request, url.clone(), ignore_etag);
        info!(url = %url, method = wire.method.as_str(), conditional, "dispatching request");

        let response = match self.transport.execute(wire).await {
            Ok(response) => response,
            Err(TransportError::Cancelled) => {
                error!(url = %url, "request cancelled");
                return Attempt::Resolved(Err(NetworkError::NoData));
            }
            Err(TransportError::Network(cause)) => {
                error!(url = %url, cause = %cause, "request failed");
                return Attempt::Resolved(Err(NetworkError::NoData));
            }
            Err(TransportError::Other(cause)) => {
                error!(url = %url, cause = %cause, "request failed outside known categories");
                return Attempt::Resolved(Err(NetworkError::Custom(cause)));
            }
        };

        if response.status == StatusCode::NOT_MODIFIED {
            if let Some(payload) = request.cached_payload(&response) {
                info!(url = %url, "serving cached payload for not-modified response");
                return Attempt::Resolved(Ok(payload));
            }
            if conditional {
                info!(
                    url = %url,
                    "nothing cached for not-modified response, refetching without validator"
                );
                return Attempt::RetryWithoutValidator;
            }
            error!(url = %url, "not-modified response with nothing cached");
            return Attempt::Resolved(Err(NetworkError::NoData));
        }

        if response.status.is_success() {
            info!(url = %url, status = response.status.as_u16(), "request finished");
            return Attempt::Resolved(Ok(response.body));
        }

        error!(
            url = %url,
            status = response.status.as_u16(),
            "server returned failure status"
        );
        Attempt::Resolved(Err(NetworkError::ServerFailure {
            status: response.status,
            body: response.body,
        }))
    }
}

impl Default for NetworkService {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the descriptor URL, upgrading a leading `http://` to `https://`.
///
/// Only the scheme token is rewritten, case-insensitively. The rest of the
/// URL is taken exactly as given, case-sensitive paths and queries included,
/// along with any `http://` embedded later in the string.
fn normalize_url(raw: &str) -> Result<Url, url::ParseError> {
    const INSECURE_SCHEME: &str = "http://";
    // The parser discards leading and trailing C0 controls and spaces, so
    // the scheme check must look at the same view or a padded `http://`
    // would dodge the upgrade.
    let raw = raw.trim_matches(|c: char| c <= ' ');
    match raw.get(..INSECURE_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(INSECURE_SCHEME) => {
            Url::parse(&format!("https://{}", &raw[INSECURE_SCHEME.len()..]))
        }
        _ => Url::parse(raw),
    }
}

/// Copy the descriptor onto the wire shape: method, body, extra headers,
/// cache bypass, validator when allowed, fixed `Accept` last.
///
/// Returns the request plus whether a validator was actually attached.
fn build_request<R>(request: &R, url: Url, ignore_etag: bool) -> (HttpRequest, bool)
where
    R: NetworkRequest + ?Sized,
{
    let mut headers = request.extra_headers();
    let mut conditional = false;
    if !ignore_etag {
        if let Some(tag) = request.etag() {
            match HeaderValue::from_str(&tag) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                    conditional = true;
                }
                Err(_) => {
                    warn!(
                        url = %url,
                        "validator is not a valid header value, firing unconditionally"
                    );
                }
            }
        }
    }
    // Fixed negotiation policy wins over anything the descriptor set.
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    let wire = HttpRequest {
        method: request.method(),
        url,
        headers,
        body: request.body(),
        bypass_cache: true,
        delegate: request.transport_delegate(),
    };
    (wire, conditional)
}
