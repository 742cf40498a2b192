//! Cross-crate invariants that only show up once `Resolver` is wired to a
//! real `CacheLayer` and a scripted `RemoteCatalog` (spec.md §8 scenarios).

use std::sync::Arc;

use buildfinder_cache::CacheLayer;
use buildfinder_catalog::FakeCatalog;
use buildfinder_config::Config;
use buildfinder_model::{BuildInfo, BuildState, Checksum, ChecksumType, RemoteArchive};
use indexmap::IndexMap;
use std::collections::BTreeSet;

fn open_cache() -> (tempfile::TempDir, CacheLayer) {
    let dir = tempfile::tempdir().unwrap();
    let path = camino::Utf8Path::from_path(dir.path()).unwrap();
    let cache = CacheLayer::open(path).unwrap();
    (dir, cache)
}

fn build_info(id: i64) -> BuildInfo {
    BuildInfo {
        id,
        package_id: 1,
        state: BuildState::Complete,
        name: "foo".into(),
        version: "1.0".into(),
        release: "1".into(),
        task_id: None,
        type_names: BTreeSet::new(),
        is_import: false,
    }
}

/// spec.md §8: "a second run over the same checksums makes zero additional
/// remote RPCs" once the archive lookup and build metadata are cached.
#[tokio::test]
async fn cached_run_makes_no_additional_remote_calls() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.known_extensions.lock().unwrap().push("jar".to_string());
    catalog.archives_by_checksum.lock().unwrap().insert(
        "abc".to_string(),
        vec![RemoteArchive {
            archive_id: 1,
            build_id: 200,
            filename: "foo.jar".into(),
            checksum: "abc".into(),
            checksum_type: "md5".into(),
            extensions: vec!["jar".into()],
        }],
    );
    catalog.builds.lock().unwrap().insert(200, build_info(200));

    let (_dir, cache) = open_cache();
    let mut config = Config::default();
    config.koji_hub_url = Some("https://koji.example.com/kojihub".to_string());
    let mut resolver = buildfinder_engine::Resolver::new(catalog.clone(), None, cache, config);

    let mut entries = IndexMap::new();
    entries.insert(Checksum::new(ChecksumType::Md5, "abc", "foo.jar"), vec!["foo.jar".to_string()]);

    resolver.resolve_batch(entries.clone(), &[]).await.unwrap();
    let calls_after_first_run = catalog.calls();
    assert!(calls_after_first_run > 0, "first run should hit the catalog at least once");

    resolver.resolve_batch(entries, &[]).await.unwrap();
    assert_eq!(catalog.calls(), calls_after_first_run, "second run must be served entirely from cache");

    let assembler = resolver.into_assembler();
    assert_eq!(assembler.found().len(), 1);
    assert_eq!(assembler.found()[0].0.id, 200);
}

/// spec.md §4.4: when one checksum resolves to archives in two different
/// builds, the candidate selector must deterministically prefer the
/// already-cached build, and the losing archive must attach to the winner's
/// `duplicate_archives` rather than creating a second build entry.
#[tokio::test]
async fn tie_break_prefers_cached_build_and_demotes_the_loser() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.known_extensions.lock().unwrap().push("jar".to_string());
    catalog.archives_by_checksum.lock().unwrap().insert(
        "dup".to_string(),
        vec![
            RemoteArchive {
                archive_id: 10,
                build_id: 300,
                filename: "a.jar".into(),
                checksum: "dup".into(),
                checksum_type: "md5".into(),
                extensions: vec!["jar".into()],
            },
            RemoteArchive {
                archive_id: 11,
                build_id: 301,
                filename: "b.jar".into(),
                checksum: "dup".into(),
                checksum_type: "md5".into(),
                extensions: vec!["jar".into()],
            },
        ],
    );
    catalog.builds.lock().unwrap().insert(300, build_info(300));
    catalog.builds.lock().unwrap().insert(301, build_info(301));

    let (_dir, cache) = open_cache();
    let mut config = Config::default();
    config.koji_hub_url = Some("https://koji.example.com/kojihub".to_string());
    let mut resolver = buildfinder_engine::Resolver::new(catalog, None, cache, config);

    let mut entries = IndexMap::new();
    entries.insert(Checksum::new(ChecksumType::Md5, "dup", "a.jar"), vec!["a.jar".to_string()]);
    resolver.resolve_batch(entries, &[]).await.unwrap();

    let assembler = resolver.into_assembler();
    assert_eq!(assembler.found().len(), 1, "exactly one build should win the tie-break");
    let (key, build) = &assembler.found()[0];
    assert!(key.id == 300 || key.id == 301);
    assert_eq!(build.archives.len() + build.duplicate_archives.len(), 2);
    assert!(!build.duplicate_archives.is_empty(), "the losing archive must be recorded, not dropped");
}
