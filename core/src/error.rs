//! Failure taxonomy for request execution.
//!
//! # Design
//! A closed enum: callers match exhaustively, and each variant carries the
//! detail a caller can act on. There is no not-modified variant; a 304 the
//! descriptor cannot resolve from cache triggers one validator-free refetch,
//! and the refetch's own outcome is what surfaces.

use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Result of one fire call: payload bytes or a classified failure.
pub type Outcome = Result<Bytes, NetworkError>;

/// Errors returned by `NetworkService` fire operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The descriptor's URL did not parse after scheme normalization. The
    /// request was never dispatched.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The transport failed, the exchange was cancelled, or no interpretable
    /// response came back.
    #[error("no data received")]
    NoData,

    /// The server answered outside the success range. Status and raw body
    /// are kept for caller inspection.
    #[error("server returned HTTP {status}")]
    ServerFailure { status: StatusCode, body: Bytes },

    /// A transport failure that fits no recognized category.
    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_url() {
        let err = NetworkError::InvalidUrl("nonsense".to_string());
        assert_eq!(err.to_string(), "invalid request URL: nonsense");
    }

    #[test]
    fn display_names_the_failure_status() {
        let err = NetworkError::ServerFailure {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: Bytes::new(),
        };
        assert_eq!(err.to_string(), "server returned HTTP 503 Service Unavailable");
    }
}
