use thiserror::Error;

use buildfinder_cache::CacheError;
use buildfinder_catalog::CatalogError;

/// Errors the Resolver can surface to its caller (spec.md §7).
///
/// Every variant here is the "fatal" half of spec.md §7's error taxonomy —
/// soft misses (a null build lookup for a known archive) are logged and
/// folded into the `(None, 0)` bucket rather than raised here.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An RPM's payload digest disagreed with the queried md5 checksum
    /// (spec.md §7, §8 scenario 5): a contract violation of the remote that
    /// aborts the whole batch without partial mutation of the output map.
    #[error("data inconsistency: rpm {nvr} payloadhash {actual} does not match queried md5 {expected}")]
    DataInconsistency { nvr: String, expected: String, actual: String },
}
