//! Top-level error type for the `buildfinder` library.
//!
//! Mirrors the teacher's layered error design: each subsystem owns its own
//! error enum, and this crate's [`BuildFinderError`] wraps them with
//! `#[from]` so call sites can use `?` across crate boundaries.

use thiserror::Error;

/// Library-level error type returned by `buildfinder` operations that span
/// more than one subsystem (the CLI, the doctor checks).
///
/// Subsystem-specific errors (`CatalogError` in `buildfinder-catalog`,
/// `ResolveError` in `buildfinder-engine`, `CacheError` in
/// `buildfinder-cache`) are the types library consumers should match on;
/// this enum exists to let the CLI binary propagate any of them with `?`.
#[derive(Error, Debug)]
pub enum BuildFinderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
