//! An in-memory [`RemoteCatalog`] test double (spec.md §8 test scenarios).
//!
//! Lets `buildfinder-engine` tests script exact remote responses without a
//! network round trip, mirroring the teacher's fake-backend test pattern.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use buildfinder_model::{BuildInfo, Nvra, RemoteArchive, RpmInfo, TaskInfo};

use crate::error::CatalogError;
use crate::RemoteCatalog;

#[derive(Default)]
pub struct FakeCatalog {
    pub archives_by_checksum: Mutex<HashMap<String, Vec<RemoteArchive>>>,
    pub builds: Mutex<HashMap<i64, BuildInfo>>,
    pub tags: Mutex<HashMap<i64, Vec<String>>>,
    pub task_info: Mutex<HashMap<i64, TaskInfo>>,
    pub archives_by_build: Mutex<HashMap<i64, Vec<RemoteArchive>>>,
    pub rpms_by_filename: Mutex<HashMap<String, RpmInfo>>,
    pub rpms_by_build: Mutex<HashMap<i64, Vec<RpmInfo>>>,
    pub known_extensions: Mutex<Vec<String>>,
    /// Number of `RemoteCatalog` calls observed, for idempotence assertions
    /// (spec.md §8: "zero additional remote RPCs" on a cached re-run).
    pub call_count: Mutex<usize>,
}

impl FakeCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_call(&self) {
        *self.call_count.lock().unwrap() += 1;
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_archives_by_checksum(&self, values: &[String]) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        self.record_call();
        let table = self.archives_by_checksum.lock().unwrap();
        Ok(values.iter().map(|v| table.get(v).cloned().unwrap_or_default()).collect())
    }

    async fn get_builds(&self, ids: &[i64]) -> Result<Vec<Option<BuildInfo>>, CatalogError> {
        self.record_call();
        let table = self.builds.lock().unwrap();
        Ok(ids.iter().map(|id| table.get(id).cloned()).collect())
    }

    async fn list_tags(&self, ids: &[i64]) -> Result<Vec<Vec<String>>, CatalogError> {
        self.record_call();
        let table = self.tags.lock().unwrap();
        Ok(ids.iter().map(|id| table.get(id).cloned().unwrap_or_default()).collect())
    }

    async fn get_task_info(&self, ids: &[i64], _with_requests: bool) -> Result<Vec<Option<TaskInfo>>, CatalogError> {
        self.record_call();
        let table = self.task_info.lock().unwrap();
        Ok(ids.iter().map(|id| table.get(id).cloned()).collect())
    }

    async fn list_archives_by_build(&self, ids: &[i64]) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        self.record_call();
        let table = self.archives_by_build.lock().unwrap();
        Ok(ids.iter().map(|id| table.get(id).cloned().unwrap_or_default()).collect())
    }

    async fn list_rpms_by_nvra(&self, nvras: &[Nvra]) -> Result<Vec<Option<RpmInfo>>, CatalogError> {
        self.record_call();
        let table = self.rpms_by_filename.lock().unwrap();
        Ok(nvras
            .iter()
            .map(|n| {
                let filename = format!("{}-{}-{}.{}.rpm", n.name, n.version, n.release, n.arch);
                table.get(&filename).cloned()
            })
            .collect())
    }

    async fn list_rpms_by_build(&self, ids: &[i64]) -> Result<Vec<Vec<RpmInfo>>, CatalogError> {
        self.record_call();
        let table = self.rpms_by_build.lock().unwrap();
        Ok(ids.iter().map(|id| table.get(id).cloned().unwrap_or_default()).collect())
    }

    async fn enrich_archive_type_info(&self, archives: &mut [RemoteArchive]) -> Result<(), CatalogError> {
        self.record_call();
        for archive in archives.iter_mut() {
            if archive.extensions.is_empty() {
                if let Some(ext) = archive.filename.rsplit('.').next() {
                    archive.extensions = vec![ext.to_string()];
                }
            }
        }
        Ok(())
    }

    async fn known_archive_extensions(&self) -> Result<Vec<String>, CatalogError> {
        self.record_call();
        Ok(self.known_extensions.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildfinder_model::BuildState;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn returns_empty_sublist_for_unknown_checksum() {
        let catalog = FakeCatalog::new();
        let result = catalog.list_archives_by_checksum(&["abc".to_string()]).await.unwrap();
        assert_eq!(result, vec![Vec::new()]);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn scripted_build_lookup_round_trips() {
        let catalog = FakeCatalog::new();
        catalog.builds.lock().unwrap().insert(
            1001,
            BuildInfo {
                id: 1001,
                package_id: 1,
                state: BuildState::Complete,
                name: "foo".into(),
                version: "1.0".into(),
                release: "1".into(),
                task_id: None,
                type_names: BTreeSet::new(),
                is_import: false,
            },
        );
        let result = catalog.get_builds(&[1001, 9999]).await.unwrap();
        assert!(result[0].is_some());
        assert!(result[1].is_none());
    }
}
