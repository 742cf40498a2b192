use thiserror::Error;

/// Errors from the persistent cache facade.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read cache file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialize cache file {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
