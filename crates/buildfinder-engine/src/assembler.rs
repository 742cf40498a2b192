//! `ResultAssembler` — the immutable finalized view over a drained run
//! (spec.md §4.7).

use std::collections::BTreeSet;

use buildfinder_model::{Build, BuildMap, BuildSystemKey};

/// The finalized output of a resolver run: sorted build list, found/not-found
/// checksum indices. Writing this to persistent JSON is a caller concern
/// (spec.md §4.7: "delegated to the external serializer").
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    all: Vec<(BuildSystemKey, Build)>,
    found: Vec<(BuildSystemKey, Build)>,
    found_checksums: BTreeSet<String>,
    not_found_checksums: BTreeSet<String>,
}

impl ResultAssembler {
    #[must_use]
    pub fn assemble(
        output: BuildMap,
        found_checksums: BTreeSet<String>,
        not_found_checksums: BTreeSet<String>,
    ) -> Self {
        let mut all: Vec<(BuildSystemKey, Build)> = output.into_iter().collect();
        all.sort_by_key(|(key, _)| key.id);

        let found = all.iter().filter(|(key, _)| !key.is_not_found()).cloned().collect();

        Self { all, found, found_checksums, not_found_checksums }
    }

    /// Every entry, including the synthetic `(None, 0)` bucket, sorted by id ascending.
    #[must_use]
    pub fn all(&self) -> &[(BuildSystemKey, Build)] {
        &self.all
    }

    /// Every entry except the synthetic `(None, 0)` bucket.
    #[must_use]
    pub fn found(&self) -> &[(BuildSystemKey, Build)] {
        &self.found
    }

    #[must_use]
    pub fn found_checksums(&self) -> &BTreeSet<String> {
        &self.found_checksums
    }

    #[must_use]
    pub fn not_found_checksums(&self) -> &BTreeSet<String> {
        &self.not_found_checksums
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildfinder_model::{BuildInfo, BuildState, BuildSystem};

    fn build(id: i64) -> Build {
        Build::new(BuildInfo {
            id,
            package_id: 1,
            state: BuildState::Complete,
            name: "n".into(),
            version: "v".into(),
            release: "r".into(),
            task_id: None,
            type_names: Default::default(),
            is_import: false,
        })
    }

    #[test]
    fn found_excludes_synthetic_bucket_but_all_includes_it() {
        let mut output = BuildMap::new();
        output.insert(BuildSystemKey::not_found(), Build::not_found());
        output.insert(BuildSystemKey::new(BuildSystem::Koji, 5), build(5));

        let assembler = ResultAssembler::assemble(output, BTreeSet::new(), BTreeSet::new());
        assert_eq!(assembler.all().len(), 2);
        assert_eq!(assembler.found().len(), 1);
        assert_eq!(assembler.found()[0].0.id, 5);
    }

    #[test]
    fn all_is_sorted_by_id_ascending() {
        let mut output = BuildMap::new();
        output.insert(BuildSystemKey::new(BuildSystem::Koji, 80), build(80));
        output.insert(BuildSystemKey::new(BuildSystem::Koji, 5), build(5));
        output.insert(BuildSystemKey::not_found(), Build::not_found());

        let assembler = ResultAssembler::assemble(output, BTreeSet::new(), BTreeSet::new());
        let ids: Vec<i64> = assembler.all().iter().map(|(k, _)| k.id).collect();
        assert_eq!(ids, vec![0, 5, 80]);
    }
}
