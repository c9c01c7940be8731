//! Error types for order store backends.
//!
//! [`StoreError`] covers the failure modes a sweep can hit while talking to
//! the document store: HTTP errors returned by the API, transport failures,
//! responses that cannot be decoded, and batch preconditions that no longer
//! hold.

use thiserror::Error;

/// Errors that can occur while querying or updating orders.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success HTTP status.
    #[error("store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be turned into orders.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// The store is not reachable or refused to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write precondition failed, so the whole batch was rejected.
    #[error("batch rejected: {0}")]
    Conflict(String),
}
