//! `RemoteCatalog` — a uniform query surface over KOJI and PNC (spec.md §4.3).
//!
//! [`RemoteCatalog`] is the capability set every backend must provide;
//! [`PncExtras`] is the handful of operations only PNC exposes, used by the
//! PNC branch of the resolver to assemble a `Build` from a `PncArtifact`.

pub mod error;
pub mod fake;
mod http_client;
pub mod koji;
pub mod pnc;

pub use error::CatalogError;
pub use fake::FakeCatalog;
pub use koji::KojiCatalog;
pub use pnc::{PncCatalog, PncExtras};

use async_trait::async_trait;
use buildfinder_model::{BuildInfo, Nvra, RemoteArchive, RpmInfo, TaskInfo};

/// Operations every backend (KOJI, PNC) must provide with list-in/list-out
/// parity (spec.md §4.3): index `i` of the response always corresponds to
/// index `i` of the request batch.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    fn name(&self) -> &'static str;

    /// One sublist per input checksum value; an empty sublist means no match.
    async fn list_archives_by_checksum(
        &self,
        values: &[String],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError>;

    /// One entry per input id; `None` is a soft miss (spec.md §7).
    async fn get_builds(&self, ids: &[i64]) -> Result<Vec<Option<BuildInfo>>, CatalogError>;

    async fn list_tags(&self, ids: &[i64]) -> Result<Vec<Vec<String>>, CatalogError>;

    async fn get_task_info(
        &self,
        ids: &[i64],
        with_requests: bool,
    ) -> Result<Vec<Option<TaskInfo>>, CatalogError>;

    async fn list_archives_by_build(&self, ids: &[i64]) -> Result<Vec<Vec<RemoteArchive>>, CatalogError>;

    /// One entry per NVRA reference; `None` when the catalog has no matching RPM.
    async fn list_rpms_by_nvra(&self, nvras: &[Nvra]) -> Result<Vec<Option<RpmInfo>>, CatalogError>;

    /// Every RPM belonging to each build id, used to populate
    /// `Build::remote_rpms` (spec.md §4.6 step h: "listRpms(buildIds) (as remoteRpms)").
    async fn list_rpms_by_build(&self, ids: &[i64]) -> Result<Vec<Vec<RpmInfo>>, CatalogError>;

    /// In-place annotation of each archive's `extensions` field (spec.md §4.1, §4.6 step g).
    async fn enrich_archive_type_info(&self, archives: &mut [RemoteArchive]) -> Result<(), CatalogError>;

    /// The union of extension names the catalog's archive-type map knows,
    /// used by `ChecksumGate` when no extensions are configured (spec.md §4.1).
    async fn known_archive_extensions(&self) -> Result<Vec<String>, CatalogError>;
}
