//! `CacheLayer` — the five named, persistent maps sitting in front of
//! [`buildfinder_catalog`](https://docs.rs)'s remote lookups (spec.md §4.2).
//!
//! Every map is read-through and write-through: a miss falls through to the
//! caller's remote lookup, and the caller writes the result back through
//! [`CacheLayer::put_*`] before using it. An empty `Vec` is a legitimate
//! cached "nothing here" answer, not an absent entry.

pub mod error;
mod persistent_map;

pub use error::CacheError;
pub use persistent_map::CacheStats;

use camino::Utf8Path;

use buildfinder_model::{Build, ChecksumType, PncArtifact, RemoteArchive, RpmInfo};
use persistent_map::PersistentMap;

fn checksum_key(checksum_type: ChecksumType, value: &str) -> String {
    format!("{checksum_type}:{value}")
}

/// The five logical maps spec.md §4.2 names, each backed by its own JSON
/// file under the configured cache directory.
///
/// File layout (an Open Question in spec.md §9, resolved in `DESIGN.md`):
/// one file per map, named for the map rather than forced into the
/// `checksums-<type>.json` / `builds.json` shape spec.md §6 describes for a
/// simpler two-file cache — the five-map model in §4.2 needs richer values
/// than a flat filename list can hold.
pub struct CacheLayer {
    archives_by_checksum: PersistentMap<Vec<RemoteArchive>>,
    rpm_build_by_checksum: PersistentMap<Vec<RpmInfo>>,
    build_by_id: PersistentMap<Build>,
    pnc_artifacts_by_checksum: PersistentMap<Vec<PncArtifact>>,
    pnc_build_by_id: PersistentMap<Build>,
}

impl CacheLayer {
    /// Open (or create) all five maps under `cache_dir`.
    pub fn open(cache_dir: &Utf8Path) -> Result<Self, CacheError> {
        Ok(Self {
            archives_by_checksum: PersistentMap::open(cache_dir.join("archives_by_checksum.json"))?,
            rpm_build_by_checksum: PersistentMap::open(cache_dir.join("rpm_build_by_checksum.json"))?,
            build_by_id: PersistentMap::open(cache_dir.join("build_by_id.json"))?,
            pnc_artifacts_by_checksum: PersistentMap::open(
                cache_dir.join("pnc_artifacts_by_checksum.json"),
            )?,
            pnc_build_by_id: PersistentMap::open(cache_dir.join("pnc_build_by_id.json"))?,
        })
    }

    #[must_use]
    pub fn get_archives_by_checksum(
        &mut self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Option<&Vec<RemoteArchive>> {
        self.archives_by_checksum.get(&checksum_key(checksum_type, value))
    }

    pub fn put_archives_by_checksum(
        &mut self,
        checksum_type: ChecksumType,
        value: &str,
        archives: Vec<RemoteArchive>,
    ) -> Result<(), CacheError> {
        let key = checksum_key(checksum_type, value);
        let overwrote_different = self.archives_by_checksum.put(key.clone(), archives)?;
        if overwrote_different {
            tracing::warn!(key, "archives-by-checksum cache entry changed on re-query");
        }
        Ok(())
    }

    #[must_use]
    pub fn get_rpm_build_by_checksum(
        &mut self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Option<&Vec<RpmInfo>> {
        self.rpm_build_by_checksum.get(&checksum_key(checksum_type, value))
    }

    /// RPM re-queries returning a different build are expected (spec.md §4.2,
    /// §7: a given RPM payload hash can legitimately move between KOJI builds
    /// as tags are reassigned), so this never warns.
    pub fn put_rpm_build_by_checksum(
        &mut self,
        checksum_type: ChecksumType,
        value: &str,
        rpms: Vec<RpmInfo>,
    ) -> Result<(), CacheError> {
        self.rpm_build_by_checksum.put(checksum_key(checksum_type, value), rpms)?;
        Ok(())
    }

    #[must_use]
    pub fn get_build_by_id(&mut self, build_id: i64) -> Option<&Build> {
        self.build_by_id.get(&build_id.to_string())
    }

    /// Unlike [`Self::put_rpm_build_by_checksum`], this map is keyed by build
    /// id, not by a content checksum that can legitimately point at a
    /// different build over time — a different record arriving for the same
    /// id means the build's own metadata changed underneath us, which is
    /// always worth a warning, so no RPM-style exception applies here.
    pub fn put_build_by_id(&mut self, build_id: i64, build: Build) -> Result<(), CacheError> {
        let key = build_id.to_string();
        let overwrote_different = self.build_by_id.put(key, build)?;
        if overwrote_different {
            tracing::warn!(build_id, "build-by-id cache entry changed on re-query");
        }
        Ok(())
    }

    #[must_use]
    pub fn get_pnc_artifacts_by_md5(&mut self, value: &str) -> Option<&Vec<PncArtifact>> {
        self.pnc_artifacts_by_checksum.get(value)
    }

    pub fn put_pnc_artifacts_by_md5(
        &mut self,
        value: &str,
        artifacts: Vec<PncArtifact>,
    ) -> Result<(), CacheError> {
        let overwrote_different = self
            .pnc_artifacts_by_checksum
            .put(value.to_string(), artifacts)?;
        if overwrote_different {
            tracing::warn!(md5 = value, "pnc-artifacts-by-checksum cache entry changed on re-query");
        }
        Ok(())
    }

    #[must_use]
    pub fn get_pnc_build_by_id(&mut self, build_id: i64) -> Option<&Build> {
        self.pnc_build_by_id.get(&build_id.to_string())
    }

    pub fn put_pnc_build_by_id(&mut self, build_id: i64, build: Build) -> Result<(), CacheError> {
        let key = build_id.to_string();
        let overwrote_different = self.pnc_build_by_id.put(key, build)?;
        if overwrote_different {
            tracing::warn!(build_id, "pnc-build-by-id cache entry changed on re-query");
        }
        Ok(())
    }

    /// Hit/miss/write counters across all five maps, for `doctor`/`resolve`
    /// run summaries.
    #[must_use]
    pub fn stats(&self) -> [(&'static str, CacheStats); 5] {
        [
            ("archives_by_checksum", self.archives_by_checksum.stats()),
            ("rpm_build_by_checksum", self.rpm_build_by_checksum.stats()),
            ("build_by_id", self.build_by_id.stats()),
            ("pnc_artifacts_by_checksum", self.pnc_artifacts_by_checksum.stats()),
            ("pnc_build_by_id", self.pnc_build_by_id.stats()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildfinder_model::{BuildInfo, BuildState};
    use std::collections::BTreeSet;

    fn cache_layer(dir: &tempfile::TempDir) -> CacheLayer {
        let path = Utf8Path::from_path(dir.path()).unwrap();
        CacheLayer::open(path).unwrap()
    }

    #[test]
    fn archives_by_checksum_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_layer(&dir);

        assert!(cache.get_archives_by_checksum(ChecksumType::Md5, "abc").is_none());

        let archive = RemoteArchive {
            archive_id: 1,
            build_id: 10,
            filename: "a.jar".into(),
            checksum: "abc".into(),
            checksum_type: "md5".into(),
            extensions: vec![],
        };
        cache
            .put_archives_by_checksum(ChecksumType::Md5, "abc", vec![archive.clone()])
            .unwrap();
        assert_eq!(
            cache.get_archives_by_checksum(ChecksumType::Md5, "abc"),
            Some(&vec![archive])
        );
    }

    #[test]
    fn empty_archive_list_is_a_valid_cached_negative() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_layer(&dir);
        cache.put_archives_by_checksum(ChecksumType::Sha256, "none", vec![]).unwrap();
        assert_eq!(cache.get_archives_by_checksum(ChecksumType::Sha256, "none"), Some(&Vec::new()));
    }

    #[test]
    fn checksum_types_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_layer(&dir);
        cache.put_archives_by_checksum(ChecksumType::Md5, "xyz", vec![]).unwrap();
        assert!(cache.get_archives_by_checksum(ChecksumType::Sha256, "xyz").is_none());
    }

    #[test]
    fn build_by_id_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_layer(&dir);
        let build = Build::new(BuildInfo {
            id: 42,
            package_id: 1,
            state: BuildState::Complete,
            name: "n".into(),
            version: "v".into(),
            release: "r".into(),
            task_id: None,
            type_names: BTreeSet::new(),
            is_import: false,
        });
        cache.put_build_by_id(42, build.clone()).unwrap();
        assert_eq!(cache.get_build_by_id(42), Some(&build));
    }

    #[test]
    fn stats_report_across_all_five_maps() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_layer(&dir);
        cache.put_archives_by_checksum(ChecksumType::Md5, "a", vec![]).unwrap();
        cache.get_archives_by_checksum(ChecksumType::Md5, "a");
        cache.get_archives_by_checksum(ChecksumType::Md5, "missing");

        let stats = cache.stats();
        let (_, archives_stats) = stats.iter().find(|(name, _)| *name == "archives_by_checksum").unwrap();
        assert_eq!(archives_stats.writes, 1);
        assert_eq!(archives_stats.hits, 1);
        assert_eq!(archives_stats.misses, 1);
    }
}
