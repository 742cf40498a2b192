//! Catalog-side shapes returned by `RemoteCatalog` lookups (spec.md §3).

use serde::{Deserialize, Serialize};

/// An archive as the catalog knows it, keyed by `archiveId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArchive {
    pub archive_id: i64,
    pub build_id: i64,
    pub filename: String,
    pub checksum: String,
    pub checksum_type: String,
    /// Archive-type annotation (e.g. `"zip"`, `"scm-source"`), populated by
    /// `enrichArchiveTypeInfo` (spec.md §4.3); empty until enriched.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl RemoteArchive {
    #[must_use]
    pub fn is_enriched(&self) -> bool {
        !self.extensions.is_empty()
    }
}

/// RPM identity and payload digest as returned by `listRpms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmInfo {
    pub id: i64,
    pub build_id: i64,
    pub nvr: String,
    /// MD5 of the RPM payload; spec.md §4.6(h) verifies this against the
    /// queried md5 checksum when present.
    pub payloadhash: String,
    pub arch: String,
    pub name: String,
    pub version: String,
    pub release: String,
}

/// The name-version-release-architecture identity parsed from an RPM filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nvra {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl Nvra {
    /// Parse `name-version-release.arch.rpm`, e.g. `glibc-2.34-83.el9.x86_64.rpm`.
    ///
    /// Returns `None` if the filename does not have at least three
    /// `-`/`.`-delimited NVRA components before the `.rpm` suffix.
    #[must_use]
    pub fn parse(filename: &str) -> Option<Self> {
        let base = filename.strip_suffix(".rpm")?;
        let (rest, arch) = base.rsplit_once('.')?;
        let (name_version, release) = rest.rsplit_once('-')?;
        let (name, version) = name_version.rsplit_once('-')?;
        if name.is_empty() || version.is_empty() || release.is_empty() || arch.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
        })
    }
}

/// PNC artifact quality as tracked by Project Newcastle (spec.md §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PncQuality {
    New,
    Verified,
    Tested,
    Deprecated,
    Blacklisted,
    Deleted,
    Temporary,
    #[serde(other)]
    Unknown,
}

impl PncQuality {
    /// Tie-break score used by the PNC candidate selector (spec.md §4.4).
    #[must_use]
    pub const fn score(self) -> i32 {
        match self {
            Self::Tested => 3,
            Self::Verified => 2,
            Self::New => 1,
            Self::Unknown => 0,
            Self::Deprecated => -1,
            Self::Temporary => -2,
            Self::Blacklisted => -3,
            Self::Deleted => -4,
        }
    }
}

/// An artifact as PNC's build-record index knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PncArtifact {
    pub id: i64,
    pub filename: String,
    pub quality: PncQuality,
    pub build_record_ids: Vec<i64>,
}

/// Remote task metadata for a build (spec.md §3: `taskInfo?`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: i64,
    pub method: String,
    pub state: String,
}

/// The original invocation parameters of a task, fetched only `withRequests=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_id: i64,
    pub params: Vec<String>,
}
