use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a [`crate::RemoteCatalog`] implementation.
///
/// Per spec.md §7 these are all "transient remote failure" — the Resolver
/// shuts its worker pool down and fails the current batch on any of them,
/// without internal retry beyond what [`crate::http_client::HttpClient`]
/// already does for 5xx/network errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{backend} request timed out after {duration:?}")]
    Timeout { backend: &'static str, duration: Duration },

    #[error("{backend} authentication failed: {status}")]
    Auth { backend: &'static str, status: u16 },

    #[error("{backend} rate limit exceeded: {status}")]
    RateLimited { backend: &'static str, status: u16 },

    #[error("{backend} returned an error response: {status}")]
    Remote { backend: &'static str, status: u16 },

    #[error("{backend} transport error: {message}")]
    Transport { backend: &'static str, message: String },

    #[error("{backend} returned a malformed response: {message}")]
    Decode { backend: &'static str, message: String },

    /// Batched response did not have the same length as its input batch
    /// (spec.md §4.3: "same length and ordering as the input batch").
    #[error("{backend} returned {got} results for a batch of {expected}")]
    BatchLengthMismatch {
        backend: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{backend} misconfigured: {message}")]
    Misconfiguration { backend: &'static str, message: String },
}
