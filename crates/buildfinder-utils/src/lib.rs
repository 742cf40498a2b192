//! Foundation utilities shared by every `buildfinder` crate: the top-level
//! error type, tracing setup, and default filesystem locations.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::BuildFinderError;
