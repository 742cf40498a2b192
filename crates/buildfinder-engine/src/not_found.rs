//! Bucket-0 (`(None, 0)`) bookkeeping and nested-archive parent attribution
//! (spec.md §4.5).
//!
//! These are free functions over a caller-held `&mut Build`/`&mut BuildMap`
//! rather than a type wrapping its own bucket, since the canonical bucket-0
//! record already lives in the Resolver's output map under
//! [`BuildSystemKey::not_found`] and must stay there as the single source of
//! truth (spec.md §3 invariant 1).

use buildfinder_model::{ArchiveRef, Build, BuildMap, Checksum, LocalArchive, RemoteArchive};

/// `addWithoutBuild`: extend an existing bucket-0 entry for this checksum,
/// or create a new synthetic archive with a strictly negative id.
pub fn add_without_build(bucket0: &mut Build, checksum: &Checksum, filenames: &[String]) {
    if let Some(existing) = bucket0.archives.iter_mut().find(|a| a.checksums.contains(checksum)) {
        existing.filenames.extend(filenames.iter().cloned());
        return;
    }

    let archive_id = -(bucket0.archives.len() as i64 + 1);
    let mut local = LocalArchive::new(ArchiveRef::Archive(RemoteArchive {
        archive_id,
        build_id: 0,
        filename: "not found".to_string(),
        checksum: checksum.value.clone(),
        checksum_type: checksum.checksum_type.as_str().to_string(),
        extensions: Vec::new(),
    }));
    local.checksums.insert(checksum.clone());
    local.filenames.extend(filenames.iter().cloned());
    bucket0.archives.push(local);
}

/// A file the analyzer itself failed to checksum (spec.md §4.6 step j):
/// always its own synthetic archive, never grouped with another filename.
pub fn add_errored_file(bucket0: &mut Build, filename: &str) {
    let archive_id = -(bucket0.archives.len() as i64 + 1);
    let mut local = LocalArchive::new(ArchiveRef::Archive(RemoteArchive {
        archive_id,
        build_id: 0,
        filename: "not found".to_string(),
        checksum: String::new(),
        checksum_type: String::new(),
        extensions: Vec::new(),
    }));
    local.filenames.insert(filename.to_string());
    bucket0.archives.push(local);
}

/// `promote`: remove any bucket-0 entry carrying `checksum`, called after any
/// successful resolution.
pub fn promote(bucket0: &mut Build, checksum: &Checksum) {
    bucket0.archives.retain(|a| !a.checksums.contains(checksum));
}

/// `resolveParent`: walk `filename` upward splitting on the last `!/`,
/// searching the output map for an already-resolved enclosing archive.
///
/// On a match, records `filename` in the parent archive's
/// `unmatchedFilenames` and returns the parent's filename; returns `None` if
/// no enclosing archive exists at any nesting level.
pub fn resolve_parent(output: &mut BuildMap, filename: &str) -> Option<String> {
    let mut candidate = filename;
    while let Some((parent, _)) = candidate.rsplit_once("!/") {
        if let Some(archive) = find_archive_with_filename_mut(output, parent) {
            archive.unmatched_filenames.insert(filename.to_string());
            return Some(parent.to_string());
        }
        candidate = parent;
    }
    None
}

fn find_archive_with_filename_mut<'a>(output: &'a mut BuildMap, target: &str) -> Option<&'a mut LocalArchive> {
    for (key, build) in output.iter_mut() {
        if key.is_not_found() {
            continue;
        }
        if let Some(archive) = build.archives.iter_mut().find(|a| a.filenames.contains(target)) {
            return Some(archive);
        }
    }
    None
}

/// Drop filenames from bucket 0 once `resolve_parent` attributed them
/// elsewhere, then drop any `LocalArchive` left with no filenames (spec.md
/// §4.6 step k).
pub fn sweep_resolved_parents(output: &mut BuildMap) {
    let bucket0_filenames: Vec<String> = output
        .get(&buildfinder_model::BuildSystemKey::not_found())
        .map(|b| b.all_filenames().map(str::to_string).collect())
        .unwrap_or_default();

    let mut resolved = Vec::new();
    for filename in &bucket0_filenames {
        if resolve_parent(output, filename).is_some() {
            resolved.push(filename.clone());
        }
    }

    if let Some(bucket0) = output.get_mut(&buildfinder_model::BuildSystemKey::not_found()) {
        for archive in bucket0.archives.iter_mut() {
            archive.filenames.retain(|f| !resolved.contains(f));
        }
        bucket0.archives.retain(|a| !a.filenames.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildfinder_model::{BuildSystem, BuildSystemKey, ChecksumType};

    #[test]
    fn add_without_build_creates_negative_archive_id() {
        let mut bucket0 = Build::not_found();
        let checksum = Checksum::new(ChecksumType::Md5, "abc", "foo.jar");
        add_without_build(&mut bucket0, &checksum, &["foo.jar".to_string()]);
        assert_eq!(bucket0.archives.len(), 1);
        assert_eq!(bucket0.archives[0].archive.id(), -1);
    }

    #[test]
    fn add_without_build_extends_existing_entry_for_same_checksum() {
        let mut bucket0 = Build::not_found();
        let checksum = Checksum::new(ChecksumType::Md5, "abc", "foo.jar");
        add_without_build(&mut bucket0, &checksum, &["foo.jar".to_string()]);
        add_without_build(&mut bucket0, &checksum, &["bar.jar".to_string()]);
        assert_eq!(bucket0.archives.len(), 1);
        assert_eq!(bucket0.archives[0].filenames.len(), 2);
    }

    #[test]
    fn promote_removes_matching_bucket0_entry() {
        let mut bucket0 = Build::not_found();
        let checksum = Checksum::new(ChecksumType::Md5, "abc", "foo.jar");
        add_without_build(&mut bucket0, &checksum, &["foo.jar".to_string()]);
        promote(&mut bucket0, &checksum);
        assert!(bucket0.archives.is_empty());
    }

    #[test]
    fn resolve_parent_finds_single_level_enclosing_archive() {
        let mut output = BuildMap::new();
        let mut build = Build::new(buildfinder_model::BuildInfo {
            id: 900,
            package_id: 1,
            state: buildfinder_model::BuildState::Complete,
            name: "n".into(),
            version: "v".into(),
            release: "r".into(),
            task_id: None,
            type_names: Default::default(),
            is_import: false,
        });
        let mut archive = LocalArchive::new(ArchiveRef::Archive(RemoteArchive {
            archive_id: 1,
            build_id: 900,
            filename: "foo.jar".into(),
            checksum: "c".into(),
            checksum_type: "md5".into(),
            extensions: vec![],
        }));
        archive.filenames.insert("foo.jar".to_string());
        build.archives.push(archive);
        output.insert(BuildSystemKey::new(BuildSystem::Koji, 900), build);

        let parent = resolve_parent(&mut output, "foo.jar!/META-INF/bar.txt");
        assert_eq!(parent.as_deref(), Some("foo.jar"));
        let build = output.get(&BuildSystemKey::new(BuildSystem::Koji, 900)).unwrap();
        assert!(build.archives[0].unmatched_filenames.contains("foo.jar!/META-INF/bar.txt"));
    }

    #[test]
    fn resolve_parent_returns_none_when_no_enclosing_archive_exists() {
        let mut output = BuildMap::new();
        output.insert(BuildSystemKey::not_found(), Build::not_found());
        assert!(resolve_parent(&mut output, "missing.jar!/inner.txt").is_none());
    }
}
