//! The resolved [`Build`] record and its [`LocalArchive`] contents (spec.md §3).

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::checksum::Checksum;
use crate::remote::{RemoteArchive, RpmInfo, TaskInfo, TaskRequest};

/// Build lifecycle state as reported by the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildState {
    Building,
    Complete,
    Deleted,
    Failed,
    Canceled,
    /// The synthetic `(None, 0)` bucket's state; never reported by a real catalog.
    All,
}

/// Canonical metadata for a build, independent of which local archives it contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub id: i64,
    pub package_id: i64,
    pub state: BuildState,
    pub name: String,
    pub version: String,
    pub release: String,
    pub task_id: Option<i64>,
    pub type_names: BTreeSet<String>,
    /// True when the build was recorded by side-loading a binary rather than
    /// building from source (spec.md GLOSSARY: "Import").
    #[serde(default)]
    pub is_import: bool,
}

impl BuildInfo {
    /// Metadata for the synthetic id-0 "not found" bucket (spec.md §6).
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            id: 0,
            package_id: 0,
            state: BuildState::All,
            name: "not found".to_string(),
            version: "not found".to_string(),
            release: "not found".to_string(),
            task_id: None,
            type_names: BTreeSet::new(),
            is_import: false,
        }
    }
}

/// Archive- or RPM-side identity of a [`LocalArchive`]: either a catalog
/// archive record or an RPM record, never both (spec.md §3: `archive | rpm`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveRef {
    Archive(RemoteArchive),
    Rpm(RpmInfo),
}

impl ArchiveRef {
    #[must_use]
    pub fn build_id(&self) -> i64 {
        match self {
            Self::Archive(a) => a.build_id,
            Self::Rpm(r) => r.build_id,
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Archive(a) => a.archive_id,
            Self::Rpm(r) => r.id,
        }
    }

    /// The filename used for within-build archive ordering (spec.md §3).
    #[must_use]
    pub fn sort_filename(&self) -> &str {
        match self {
            Self::Archive(a) => &a.filename,
            Self::Rpm(r) => &r.nvr,
        }
    }
}

/// One matched archive (or RPM) contributed to a [`Build`], with every local
/// filename it was found under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArchive {
    pub archive: ArchiveRef,
    /// Ordered, deduplicated local filenames matched to this archive's checksum.
    pub filenames: IndexSet<String>,
    /// Filenames of nested-archive entries whose enclosing archive is this
    /// one, but which themselves did not resolve to any build (spec.md §4.5
    /// `resolveParent`).
    #[serde(default)]
    pub unmatched_filenames: BTreeSet<String>,
    /// Checksums known for this archive, seeded from the analyzer's
    /// file-to-checksums map when available (spec.md §4.6 `addArchiveToBuild`).
    #[serde(default)]
    pub checksums: BTreeSet<Checksum>,
    #[serde(default)]
    pub built_from_source: bool,
}

// `BTreeSet<Checksum>` requires a total order; checksums are compared by
// (type, value, filename) for determinism, not by any semantic meaning.
impl PartialOrd for Checksum {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Checksum {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.checksum_type, &self.value, &self.filename).cmp(&(
            other.checksum_type,
            &other.value,
            &other.filename,
        ))
    }
}

impl LocalArchive {
    #[must_use]
    pub fn new(archive: ArchiveRef) -> Self {
        Self {
            archive,
            filenames: IndexSet::new(),
            unmatched_filenames: BTreeSet::new(),
            checksums: BTreeSet::new(),
            built_from_source: false,
        }
    }
}

/// A resolved build and every local archive it was found to contribute.
///
/// Invariant (spec.md §3): for every `a` in `archives`, `a.archive.build_id()
/// == build_info.id` unless this is the synthetic id-0 bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub build_info: BuildInfo,
    pub tags: Vec<String>,
    pub remote_archives: Vec<RemoteArchive>,
    pub remote_rpms: Vec<RpmInfo>,
    pub task_info: Option<TaskInfo>,
    pub task_request: Option<TaskRequest>,
    /// Ordered within the build by `archive.filename` ascending (spec.md §3).
    pub archives: Vec<LocalArchive>,
    /// Archives that matched this build's content but lost a candidate-selector
    /// tie against an already-resolved build (spec.md §4.4 rule 1).
    #[serde(default)]
    pub duplicate_archives: Vec<LocalArchive>,
}

impl Build {
    #[must_use]
    pub fn new(build_info: BuildInfo) -> Self {
        Self {
            build_info,
            tags: Vec::new(),
            remote_archives: Vec::new(),
            remote_rpms: Vec::new(),
            task_info: None,
            task_request: None,
            archives: Vec::new(),
            duplicate_archives: Vec::new(),
        }
    }

    /// Construct the synthetic `(None, 0)` bucket (spec.md §3, §6).
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(BuildInfo::not_found())
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.build_info.id
    }

    /// Re-sort `archives` by filename ascending, as required after
    /// `addArchiveToBuild` inserts a new entry (spec.md §4.6).
    pub fn resort_archives(&mut self) {
        self.archives
            .sort_by(|a, b| a.archive.sort_filename().cmp(b.archive.sort_filename()));
    }

    /// All filenames currently attributed to this build, across every archive.
    pub fn all_filenames(&self) -> impl Iterator<Item = &str> {
        self.archives.iter().flat_map(|a| a.filenames.iter().map(String::as_str))
    }
}

/// The Resolver's output map: exactly the keyed collection spec.md §3
/// describes, keyed by [`crate::build_system::BuildSystemKey`].
pub type BuildMap = IndexMap<crate::build_system::BuildSystemKey, Build>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_system::{BuildSystem, BuildSystemKey};

    #[test]
    fn not_found_bucket_has_expected_shape() {
        let b = Build::not_found();
        assert_eq!(b.id(), 0);
        assert_eq!(b.build_info.state, BuildState::All);
        assert_eq!(b.build_info.name, "not found");
    }

    #[test]
    fn resort_orders_archives_by_filename() {
        let mut b = Build::new(BuildInfo {
            id: 1,
            package_id: 1,
            state: BuildState::Complete,
            name: "n".into(),
            version: "v".into(),
            release: "r".into(),
            task_id: None,
            type_names: BTreeSet::new(),
            is_import: false,
        });
        let make = |filename: &str, archive_id: i64| {
            LocalArchive::new(ArchiveRef::Archive(RemoteArchive {
                archive_id,
                build_id: 1,
                filename: filename.to_string(),
                checksum: "x".into(),
                checksum_type: "md5".into(),
                extensions: vec![],
            }))
        };
        b.archives.push(make("z.jar", 2));
        b.archives.push(make("a.jar", 1));
        b.resort_archives();
        assert_eq!(b.archives[0].archive.sort_filename(), "a.jar");
        assert_eq!(b.archives[1].archive.sort_filename(), "z.jar");
    }

    #[test]
    fn build_map_holds_not_found_key() {
        let mut map = BuildMap::new();
        map.insert(BuildSystemKey::not_found(), Build::not_found());
        assert!(map.contains_key(&BuildSystemKey::new(BuildSystem::None, 0)));
    }
}
