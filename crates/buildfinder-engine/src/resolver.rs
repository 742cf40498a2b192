//! `Resolver` — drains a batch of checksums, fans out to a [`RemoteCatalog`],
//! and folds the results into the output [`BuildMap`] (spec.md §4.6).
//!
//! The PNC branch (`findBuildsPnc`) runs first when PNC is configured; any
//! checksum it leaves unresolved falls through to the KOJI branch
//! (`findBuilds`), per spec.md §4.6's top-level loop.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Semaphore;

use buildfinder_cache::CacheLayer;
use buildfinder_catalog::{CatalogError, PncExtras, RemoteCatalog};
use buildfinder_config::Config;
use buildfinder_gate::{is_remote_resolvable, ChecksumGate, GateDecision};
use buildfinder_model::{
    ArchiveRef, Build, BuildSystem, BuildSystemKey, Checksum, ChecksumType, LocalArchive, Nvra,
    RemoteArchive,
};
use buildfinder_selectors::{select_koji_candidate, select_pnc_candidate, KojiCandidate, PncCandidate};

use crate::assembler::ResultAssembler;
use crate::error::ResolveError;
use crate::not_found;

/// Orchestrates one resolver run: owns the output map and the found/not-found
/// checksum indices, and drives every `RemoteCatalog`/`CacheLayer` call.
pub struct Resolver {
    catalog: Arc<dyn RemoteCatalog>,
    pnc_extras: Option<Arc<dyn PncExtras>>,
    cache: CacheLayer,
    config: Config,
    gate: Option<ChecksumGate>,
    output: buildfinder_model::BuildMap,
    found_checksums: std::collections::BTreeSet<String>,
    not_found_checksums: std::collections::BTreeSet<String>,
}

impl Resolver {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        pnc_extras: Option<Arc<dyn PncExtras>>,
        cache: CacheLayer,
        config: Config,
    ) -> Self {
        let mut output = buildfinder_model::BuildMap::new();
        output.insert(BuildSystemKey::not_found(), Build::not_found());
        Self {
            catalog,
            pnc_extras,
            cache,
            config,
            gate: None,
            output,
            found_checksums: std::collections::BTreeSet::new(),
            not_found_checksums: std::collections::BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn output(&self) -> &buildfinder_model::BuildMap {
        &self.output
    }

    /// Consume the resolver into the finalized, sorted view (spec.md §4.7).
    #[must_use]
    pub fn into_assembler(self) -> ResultAssembler {
        ResultAssembler::assemble(self.output, self.found_checksums, self.not_found_checksums)
    }

    async fn ensure_gate(&mut self) -> Result<(), ResolveError> {
        if self.gate.is_none() {
            let catalog_extensions = self.catalog.known_archive_extensions().await?;
            self.gate = Some(ChecksumGate::new(catalog_extensions, self.config.archive_extensions.clone()));
        }
        Ok(())
    }

    /// Drain one batch of `(checksum, filenames)` entries plus any filenames
    /// the analyzer itself failed to checksum (spec.md §4.6 steps a-l).
    pub async fn resolve_batch(
        &mut self,
        entries: IndexMap<Checksum, Vec<String>>,
        errored_files: &[String],
    ) -> Result<(), ResolveError> {
        let remaining = if self.config.pnc_url.is_some() && self.pnc_extras.is_some() {
            self.find_builds_pnc(&entries).await?
        } else {
            entries.clone()
        };

        if !remaining.is_empty() {
            self.find_builds(&remaining).await?;
        }

        for filename in errored_files {
            let bucket0 = self
                .output
                .get_mut(&BuildSystemKey::not_found())
                .expect("bucket0 always present");
            not_found::add_errored_file(bucket0, filename);
        }

        not_found::sweep_resolved_parents(&mut self.output);
        Ok(())
    }

    fn get_or_insert_build(&mut self, system: BuildSystem, id: i64) -> Option<&mut Build> {
        let key = BuildSystemKey::new(system, id);
        if !self.output.contains_key(&key) {
            let build = match system {
                BuildSystem::Pnc => self.cache.get_pnc_build_by_id(id)?.clone(),
                _ => self.cache.get_build_by_id(id)?.clone(),
            };
            self.output.insert(key, build);
        }
        self.output.get_mut(&key)
    }

    // --- PNC branch (findBuildsPnc) -----------------------------------

    /// Resolve as many checksums as PNC can answer, returning the entries
    /// that remain unresolved for the caller to pass to `find_builds`.
    async fn find_builds_pnc(
        &mut self,
        entries: &IndexMap<Checksum, Vec<String>>,
    ) -> Result<IndexMap<Checksum, Vec<String>>, ResolveError> {
        let Some(pnc) = self.pnc_extras.clone() else {
            return Ok(entries.clone());
        };

        let md5_entries: Vec<Checksum> = entries
            .keys()
            .filter(|c| c.checksum_type == ChecksumType::Md5)
            .cloned()
            .collect();

        let mut remaining = entries.clone();
        if md5_entries.is_empty() {
            return Ok(remaining);
        }

        let values: Vec<String> = md5_entries.iter().map(|c| c.value.clone()).collect();
        let artifacts_per_checksum = pnc.get_artifacts_by_md5(&values).await?;
        if artifacts_per_checksum.len() != values.len() {
            return Err(ResolveError::Catalog(CatalogError::BatchLengthMismatch {
                backend: "pnc",
                expected: values.len(),
                got: artifacts_per_checksum.len(),
            }));
        }

        let mut resolved_build_ids: Vec<i64> = Vec::new();
        let mut chosen: Vec<(Checksum, i64, buildfinder_model::PncArtifact)> = Vec::new();

        for (checksum, artifacts) in md5_entries.iter().zip(artifacts_per_checksum) {
            if artifacts.is_empty() {
                continue;
            }
            let candidates: Vec<PncCandidate> = artifacts
                .iter()
                .map(|a| PncCandidate {
                    artifact_id: a.id,
                    quality: a.quality,
                    has_build_record: !a.build_record_ids.is_empty(),
                })
                .collect();
            let Some(winner_id) = select_pnc_candidate(&candidates) else { continue };
            let Some(artifact) = artifacts.into_iter().find(|a| a.id == winner_id) else { continue };
            let Some(&build_id) = artifact.build_record_ids.first() else { continue };
            resolved_build_ids.push(build_id);
            chosen.push((checksum.clone(), build_id, artifact));
        }

        resolved_build_ids.sort_unstable();
        resolved_build_ids.dedup();

        let mut needing_metadata = Vec::new();
        for id in &resolved_build_ids {
            if self.cache.get_pnc_build_by_id(*id).is_none() {
                needing_metadata.push(*id);
            }
        }

        if !needing_metadata.is_empty() {
            let (builds_info, configs, product_versions, push_results, artifacts_by_build) = tokio::join!(
                pnc.get_build_records_by_id(&needing_metadata),
                pnc.get_build_configurations_by_id(&needing_metadata),
                pnc.get_product_versions_by_id(&needing_metadata),
                pnc.get_build_record_push_results_by_id(&needing_metadata),
                pnc.get_built_artifacts_by_id(&needing_metadata),
            );
            let builds_info = builds_info?;
            let configs = configs?;
            let product_versions = product_versions?;
            let push_results = push_results?;
            let artifacts_by_build = artifacts_by_build?;

            for (idx, id) in needing_metadata.iter().enumerate() {
                match builds_info.get(idx).cloned().flatten() {
                    Some(info) => {
                        let mut build = Build::new(info);
                        // Build carries no dedicated fields for PNC's
                        // configuration/product-version/push-result lists
                        // (spec.md §4.6 findBuildsPnc); adapted alongside
                        // configs into `tags`, the closest canonical analog.
                        build.tags = configs.get(idx).cloned().unwrap_or_default();
                        build.tags.extend(product_versions.get(idx).cloned().unwrap_or_default());
                        build.tags.extend(push_results.get(idx).cloned().unwrap_or_default());
                        build.remote_archives = artifacts_by_build.get(idx).cloned().unwrap_or_default();
                        self.cache.put_pnc_build_by_id(*id, build)?;
                    }
                    None => {
                        tracing::warn!(build_id = *id, "soft miss: pnc build record lookup returned null");
                    }
                }
            }
        }

        for (checksum, build_id, artifact) in chosen {
            let filenames = entries.get(&checksum).cloned().unwrap_or_default();

            let Some(build) = self.get_or_insert_build(BuildSystem::Pnc, build_id) else {
                tracing::warn!(build_id, "soft miss: pnc build metadata unavailable for matched artifact");
                continue;
            };

            let synthetic = RemoteArchive {
                archive_id: artifact.id,
                build_id,
                filename: artifact.filename.clone(),
                checksum: checksum.value.clone(),
                checksum_type: checksum.checksum_type.as_str().to_string(),
                extensions: Vec::new(),
            };
            add_archive_to_build(build, synthetic, &filenames, &checksum);

            let bucket0 = self
                .output
                .get_mut(&BuildSystemKey::not_found())
                .expect("bucket0 present");
            not_found::promote(bucket0, &checksum);
            self.found_checksums.insert(checksum.value.clone());
            self.not_found_checksums.remove(&checksum.value);

            remaining.shift_remove(&checksum);
        }

        Ok(remaining)
    }

    // --- KOJI branch (findBuilds) --------------------------------------

    async fn find_builds(&mut self, entries: &IndexMap<Checksum, Vec<String>>) -> Result<(), ResolveError> {
        self.ensure_gate().await?;
        let gate = self.gate.clone().expect("gate initialized above");

        let mut rpm_checksums = Vec::new();
        let mut archive_checksums = Vec::new();

        for (checksum, filenames) in entries {
            // spec.md §6/§9: only md5 is wired against remotes today; other
            // digest types fall straight into bucket 0.
            if !is_remote_resolvable(checksum.checksum_type) {
                let bucket0 = self
                    .output
                    .get_mut(&BuildSystemKey::not_found())
                    .expect("bucket0 present");
                not_found::add_without_build(bucket0, checksum, filenames);
                self.not_found_checksums.insert(checksum.value.clone());
                continue;
            }

            match gate.evaluate(checksum, filenames) {
                GateDecision::Accept { is_rpm: true } => rpm_checksums.push(checksum.clone()),
                GateDecision::Accept { is_rpm: false } => archive_checksums.push(checksum.clone()),
                GateDecision::SkipEmptyDigest | GateDecision::SkipNoExtensionMatch => {}
            }
        }

        self.resolve_archive_checksums(&archive_checksums, entries).await?;
        self.resolve_rpm_checksums(&rpm_checksums, entries).await?;
        Ok(())
    }

    async fn resolve_archive_checksums(
        &mut self,
        checksums: &[Checksum],
        entries: &IndexMap<Checksum, Vec<String>>,
    ) -> Result<(), ResolveError> {
        if checksums.is_empty() {
            return Ok(());
        }

        let mut needs_remote: Vec<Checksum> = Vec::new();
        for checksum in checksums {
            if self.cache.get_archives_by_checksum(ChecksumType::Md5, &checksum.value).is_none() {
                needs_remote.push(checksum.clone());
            }
        }

        if !needs_remote.is_empty() {
            let values: Vec<String> = needs_remote.iter().map(|c| c.value.clone()).collect();
            let mut fetched = fetch_archives_concurrent(
                &self.catalog,
                values.clone(),
                self.config.koji_multicall_size,
                self.config.koji_num_threads,
            )
            .await?;

            if fetched.len() != values.len() {
                return Err(ResolveError::Catalog(CatalogError::BatchLengthMismatch {
                    backend: self.catalog.name(),
                    expected: values.len(),
                    got: fetched.len(),
                }));
            }

            // enrichArchiveTypeInfo runs once over the flattened batch rather
            // than per-checksum, then is redistributed back by group length
            // (spec.md §4.6 step f).
            let mut flat: Vec<RemoteArchive> = fetched.iter().flatten().cloned().collect();
            self.catalog.enrich_archive_type_info(&mut flat).await?;
            let mut flat_iter = flat.into_iter();
            for group in &mut fetched {
                let len = group.len();
                *group = flat_iter.by_ref().take(len).collect();
            }

            for (checksum, archives) in needs_remote.iter().zip(fetched) {
                for archive in &archives {
                    if archive.checksum != checksum.value {
                        tracing::warn!(
                            queried = %checksum.value,
                            returned = %archive.checksum,
                            "catalog returned an archive for a different checksum than queried"
                        );
                    }
                }
                self.cache.put_archives_by_checksum(ChecksumType::Md5, &checksum.value, archives)?;
            }
        }

        let mut build_ids: Vec<i64> = Vec::new();
        for checksum in checksums {
            if let Some(archives) = self.cache.get_archives_by_checksum(ChecksumType::Md5, &checksum.value) {
                build_ids.extend(archives.iter().map(|a| a.build_id));
            }
        }
        build_ids.sort_unstable();
        build_ids.dedup();

        let mut needing_metadata = Vec::new();
        for id in &build_ids {
            if self.cache.get_build_by_id(*id).is_none() {
                needing_metadata.push(*id);
            }
        }

        if !needing_metadata.is_empty() {
            self.fetch_and_cache_build_metadata(&needing_metadata).await?;
        }

        for checksum in checksums {
            let filenames = entries.get(checksum).cloned().unwrap_or_default();
            let archives = self
                .cache
                .get_archives_by_checksum(ChecksumType::Md5, &checksum.value)
                .cloned()
                .unwrap_or_default();
            self.resolve_candidates_for_checksum(checksum, &filenames, archives);
        }

        Ok(())
    }

    /// getBuilds, listTags, listArchivesByBuild, listRpms, and (conditionally)
    /// getTaskInfo as five parallel calls (spec.md §4.6 step f, spec.md §3's
    /// `remoteRpms` invariant).
    async fn fetch_and_cache_build_metadata(&mut self, ids: &[i64]) -> Result<(), ResolveError> {
        let (builds_info, tags, mut archives_by_build, rpms_by_build, task_info) = tokio::join!(
            self.catalog.get_builds(ids),
            self.catalog.list_tags(ids),
            self.catalog.list_archives_by_build(ids),
            self.catalog.list_rpms_by_build(ids),
            self.catalog.get_task_info(ids, true),
        );
        let builds_info = builds_info?;
        let tags = tags?;
        let task_info = task_info?;
        let rpms_by_build = rpms_by_build?;
        let mut archives_by_build = archives_by_build?;

        // Re-enrich any sub-archive (scm-source, project-source, patches,
        // ...) that came back without type info (spec.md §4.6 step g);
        // simplified here to "any archive lacking extensions" rather than
        // filtering by archive-type name.
        let mut flat: Vec<RemoteArchive> = archives_by_build.iter().flatten().cloned().collect();
        if flat.iter().any(|a| a.extensions.is_empty()) {
            self.catalog.enrich_archive_type_info(&mut flat).await?;
            let mut flat_iter = flat.into_iter();
            for group in &mut archives_by_build {
                let len = group.len();
                *group = flat_iter.by_ref().take(len).collect();
            }
        }

        for (idx, id) in ids.iter().enumerate() {
            match builds_info.get(idx).cloned().flatten() {
                Some(info) => {
                    let has_task = info.task_id.is_some();
                    let mut build = Build::new(info);
                    build.tags = tags.get(idx).cloned().unwrap_or_default();
                    build.remote_archives = archives_by_build.get(idx).cloned().unwrap_or_default();
                    build.remote_rpms = rpms_by_build.get(idx).cloned().unwrap_or_default();
                    if has_task {
                        build.task_info = task_info.get(idx).cloned().flatten();
                    }
                    self.cache.put_build_by_id(*id, build)?;
                }
                None => {
                    tracing::warn!(build_id = *id, "soft miss: build lookup returned null for a known archive id");
                }
            }
        }
        Ok(())
    }

    fn resolve_candidates_for_checksum(&mut self, checksum: &Checksum, filenames: &[String], archives: Vec<RemoteArchive>) {
        match archives.len() {
            0 => {
                let bucket0 = self
                    .output
                    .get_mut(&BuildSystemKey::not_found())
                    .expect("bucket0 present");
                not_found::add_without_build(bucket0, checksum, filenames);
                self.not_found_checksums.insert(checksum.value.clone());
            }
            1 => {
                let archive = archives.into_iter().next().expect("len checked above");
                let build_id = archive.build_id;
                match self.get_or_insert_build(BuildSystem::Koji, build_id) {
                    Some(build) => {
                        add_archive_to_build(build, archive, filenames, checksum);
                        self.promote_and_mark_found(checksum);
                    }
                    None => {
                        tracing::warn!(build_id, "soft miss: build metadata unavailable for matched archive");
                        let bucket0 = self
                            .output
                            .get_mut(&BuildSystemKey::not_found())
                            .expect("bucket0 present");
                        not_found::add_without_build(bucket0, checksum, filenames);
                        self.not_found_checksums.insert(checksum.value.clone());
                    }
                }
            }
            _ => self.resolve_multi_candidate(checksum, filenames, archives),
        }
    }

    fn resolve_multi_candidate(&mut self, checksum: &Checksum, filenames: &[String], archives: Vec<RemoteArchive>) {
        let mut distinct_ids: Vec<i64> = archives.iter().map(|a| a.build_id).collect();
        distinct_ids.sort_unstable();
        distinct_ids.dedup();

        let mut metadata = Vec::new();
        for id in &distinct_ids {
            if let Some(build) = self.get_or_insert_build(BuildSystem::Koji, *id) {
                metadata.push((*id, build.build_info.state, build.tags.clone(), build.build_info.is_import));
            }
        }

        let koji_candidates: Vec<KojiCandidate> = metadata
            .iter()
            .map(|(id, state, tags, is_import)| KojiCandidate {
                id: *id,
                state: *state,
                tags: tags.as_slice(),
                is_import: *is_import,
            })
            .collect();

        let resolved_ids: std::collections::BTreeSet<i64> = self
            .output
            .keys()
            .filter(|k| matches!(k.system, BuildSystem::Koji))
            .map(|k| k.id)
            .collect();

        let selection = select_koji_candidate(&koji_candidates, |id| resolved_ids.contains(&id));

        if let Some(selection) = selection {
            let winner_id = selection.chosen_id;
            let winner_archive = archives.iter().find(|a| a.build_id == winner_id).cloned();
            let losers: Vec<RemoteArchive> =
                archives.iter().filter(|a| a.build_id != winner_id).cloned().collect();

            if let Some(winner_archive) = winner_archive {
                if let Some(build) = self.get_or_insert_build(BuildSystem::Koji, winner_id) {
                    add_archive_to_build(build, winner_archive, filenames, checksum);
                    for loser in losers {
                        build.duplicate_archives.push(LocalArchive::new(ArchiveRef::Archive(loser)));
                    }
                    self.promote_and_mark_found(checksum);
                    return;
                }
            }
        }

        let bucket0 = self.output.get_mut(&BuildSystemKey::not_found()).expect("bucket0 present");
        not_found::add_without_build(bucket0, checksum, filenames);
        self.not_found_checksums.insert(checksum.value.clone());
    }

    fn promote_and_mark_found(&mut self, checksum: &Checksum) {
        let bucket0 = self.output.get_mut(&BuildSystemKey::not_found()).expect("bucket0 present");
        not_found::promote(bucket0, checksum);
        self.found_checksums.insert(checksum.value.clone());
        self.not_found_checksums.remove(&checksum.value);
    }

    async fn resolve_rpm_checksums(
        &mut self,
        checksums: &[Checksum],
        entries: &IndexMap<Checksum, Vec<String>>,
    ) -> Result<(), ResolveError> {
        if checksums.is_empty() {
            return Ok(());
        }

        let mut needs_remote: Vec<(Checksum, Nvra)> = Vec::new();
        for checksum in checksums {
            if self.cache.get_rpm_build_by_checksum(ChecksumType::Md5, &checksum.value).is_some() {
                continue;
            }
            let filenames = entries.get(checksum).cloned().unwrap_or_default();
            let Some(filename) = filenames.iter().find(|f| f.ends_with(".rpm")) else {
                tracing::warn!(checksum = %checksum.value, "rpm checksum entry has no .rpm filename");
                continue;
            };
            match Nvra::parse(filename) {
                Some(nvra) => needs_remote.push((checksum.clone(), nvra)),
                None => tracing::warn!(filename, "failed to parse nvra from rpm filename"),
            }
        }

        if !needs_remote.is_empty() {
            let nvras: Vec<Nvra> = needs_remote.iter().map(|(_, n)| n.clone()).collect();
            let fetched = fetch_rpms_concurrent(
                &self.catalog,
                nvras.clone(),
                self.config.koji_multicall_size,
                self.config.koji_num_threads,
            )
            .await?;

            if fetched.len() != nvras.len() {
                return Err(ResolveError::Catalog(CatalogError::BatchLengthMismatch {
                    backend: self.catalog.name(),
                    expected: nvras.len(),
                    got: fetched.len(),
                }));
            }

            for ((checksum, _), rpm) in needs_remote.iter().zip(fetched) {
                match rpm {
                    Some(rpm_info) => {
                        // spec.md §7, §8 scenario 5: the remote's own payload
                        // digest must agree with what was queried, or the
                        // whole batch aborts before any RPM-phase mutation.
                        if !rpm_info.payloadhash.eq_ignore_ascii_case(&checksum.value) {
                            return Err(ResolveError::DataInconsistency {
                                nvr: rpm_info.nvr.clone(),
                                expected: checksum.value.clone(),
                                actual: rpm_info.payloadhash.clone(),
                            });
                        }
                        self.cache.put_rpm_build_by_checksum(ChecksumType::Md5, &checksum.value, vec![rpm_info])?;
                    }
                    None => {
                        self.cache.put_rpm_build_by_checksum(ChecksumType::Md5, &checksum.value, Vec::new())?;
                    }
                }
            }
        }

        let mut build_ids = Vec::new();
        for checksum in checksums {
            if let Some(rpms) = self.cache.get_rpm_build_by_checksum(ChecksumType::Md5, &checksum.value) {
                build_ids.extend(rpms.iter().map(|r| r.build_id));
            }
        }
        build_ids.sort_unstable();
        build_ids.dedup();

        let mut needing_metadata = Vec::new();
        for id in &build_ids {
            if self.cache.get_build_by_id(*id).is_none() {
                needing_metadata.push(*id);
            }
        }
        if !needing_metadata.is_empty() {
            self.fetch_and_cache_build_metadata(&needing_metadata).await?;
        }

        for checksum in checksums {
            let filenames = entries.get(checksum).cloned().unwrap_or_default();
            let rpms = self
                .cache
                .get_rpm_build_by_checksum(ChecksumType::Md5, &checksum.value)
                .cloned()
                .unwrap_or_default();

            match rpms.into_iter().next() {
                Some(rpm_info) => {
                    let build_id = rpm_info.build_id;
                    match self.get_or_insert_build(BuildSystem::Koji, build_id) {
                        Some(build) => {
                            add_rpm_to_build(build, rpm_info, &filenames, checksum);
                            self.promote_and_mark_found(checksum);
                        }
                        None => {
                            tracing::warn!(build_id, "soft miss: build metadata unavailable for matched rpm");
                            let bucket0 =
                                self.output.get_mut(&BuildSystemKey::not_found()).expect("bucket0 present");
                            not_found::add_without_build(bucket0, checksum, &filenames);
                            self.not_found_checksums.insert(checksum.value.clone());
                        }
                    }
                }
                None => {
                    let bucket0 = self.output.get_mut(&BuildSystemKey::not_found()).expect("bucket0 present");
                    not_found::add_without_build(bucket0, checksum, &filenames);
                    self.not_found_checksums.insert(checksum.value.clone());
                }
            }
        }

        Ok(())
    }
}

/// `addArchiveToBuild`: union filenames into an existing `LocalArchive` for
/// this archive id, or insert a new one and re-sort (spec.md §4.6).
fn add_archive_to_build(build: &mut Build, archive: RemoteArchive, filenames: &[String], checksum: &Checksum) {
    if let Some(existing) = build.archives.iter_mut().find(|a| a.archive.id() == archive.archive_id) {
        existing.filenames.extend(filenames.iter().cloned());
        existing.checksums.insert(checksum.clone());
        return;
    }
    let mut local = LocalArchive::new(ArchiveRef::Archive(archive));
    local.filenames.extend(filenames.iter().cloned());
    local.checksums.insert(checksum.clone());
    build.archives.push(local);
    build.resort_archives();
}

/// `addRpmToBuild`: the RPM-side counterpart of [`add_archive_to_build`].
fn add_rpm_to_build(
    build: &mut Build,
    rpm: buildfinder_model::RpmInfo,
    filenames: &[String],
    checksum: &Checksum,
) {
    if let Some(existing) = build.archives.iter_mut().find(|a| a.archive.id() == rpm.id) {
        existing.filenames.extend(filenames.iter().cloned());
        existing.checksums.insert(checksum.clone());
        return;
    }
    let mut local = LocalArchive::new(ArchiveRef::Rpm(rpm));
    local.filenames.extend(filenames.iter().cloned());
    local.checksums.insert(checksum.clone());
    build.archives.push(local);
    build.resort_archives();
}

/// Bounded-concurrency fan-out over `list_archives_by_checksum`, chunked by
/// `multicall_size` and capped at `concurrency` in-flight requests.
///
/// Results are collected in submission order (one output group per input
/// chunk, in chunk order), never completion order, so the write-through
/// cache stays aligned with the checksums that were actually queried
/// (spec.md §5).
async fn fetch_archives_concurrent(
    catalog: &Arc<dyn RemoteCatalog>,
    values: Vec<String>,
    multicall_size: usize,
    concurrency: usize,
) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::new();
    for chunk in values.chunks(multicall_size.max(1)) {
        let catalog = Arc::clone(catalog);
        let semaphore = Arc::clone(&semaphore);
        let chunk = chunk.to_vec();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            catalog.list_archives_by_checksum(&chunk).await
        }));
    }

    let mut out = Vec::with_capacity(values.len());
    for handle in handles {
        let chunk_result = handle.await.expect("archive fetch task panicked")?;
        out.extend(chunk_result);
    }
    Ok(out)
}

/// The RPM-side counterpart of [`fetch_archives_concurrent`].
async fn fetch_rpms_concurrent(
    catalog: &Arc<dyn RemoteCatalog>,
    nvras: Vec<Nvra>,
    multicall_size: usize,
    concurrency: usize,
) -> Result<Vec<Option<buildfinder_model::RpmInfo>>, CatalogError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::new();
    for chunk in nvras.chunks(multicall_size.max(1)) {
        let catalog = Arc::clone(catalog);
        let semaphore = Arc::clone(&semaphore);
        let chunk = chunk.to_vec();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            catalog.list_rpms_by_nvra(&chunk).await
        }));
    }

    let mut out = Vec::with_capacity(nvras.len());
    for handle in handles {
        let chunk_result = handle.await.expect("rpm fetch task panicked")?;
        out.extend(chunk_result);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildfinder_cache::CacheLayer;
    use buildfinder_catalog::FakeCatalog;
    use buildfinder_config::Config;
    use buildfinder_model::{BuildInfo, BuildState, ChecksumType};
    use std::collections::BTreeSet;

    fn resolver(catalog: FakeCatalog, dir: &tempfile::TempDir) -> Resolver {
        let path = camino::Utf8Path::from_path(dir.path()).unwrap();
        let cache = CacheLayer::open(path).unwrap();
        let mut config = Config::default();
        config.koji_hub_url = Some("https://koji.example.com/kojihub".to_string());
        Resolver::new(Arc::new(catalog), None, cache, config)
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

    #[tokio::test]
    async fn single_archive_match_is_promoted_out_of_bucket_zero() {
        let catalog = FakeCatalog::new();
        catalog.known_extensions.lock().unwrap().push("jar".to_string());
        catalog.archives_by_checksum.lock().unwrap().insert(
            "abc".to_string(),
            vec![RemoteArchive {
                archive_id: 5,
                build_id: 100,
                filename: "foo.jar".into(),
                checksum: "abc".into(),
                checksum_type: "md5".into(),
                extensions: vec!["jar".into()],
            }],
        );
        catalog.builds.lock().unwrap().insert(100, build_info(100));

        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(catalog, &dir);

        let mut entries = IndexMap::new();
        entries.insert(Checksum::new(ChecksumType::Md5, "abc", "foo.jar"), vec!["foo.jar".to_string()]);
        resolver.resolve_batch(entries, &[]).await.unwrap();

        let assembler = resolver.into_assembler();
        assert!(assembler.found_checksums().contains("abc"));
        assert_eq!(assembler.found().len(), 1);
        assert_eq!(assembler.found()[0].0.id, 100);
    }

    #[tokio::test]
    async fn unmatched_checksum_lands_in_bucket_zero() {
        let catalog = FakeCatalog::new();
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(catalog, &dir);

        let mut entries = IndexMap::new();
        entries.insert(Checksum::new(ChecksumType::Md5, "nomatch", "foo.jar"), vec!["foo.jar".to_string()]);
        resolver.resolve_batch(entries, &[]).await.unwrap();

        let assembler = resolver.into_assembler();
        assert!(assembler.not_found_checksums().contains("nomatch"));
        let bucket0 = &assembler.all()[0];
        assert!(bucket0.0.is_not_found());
        assert_eq!(bucket0.1.archives.len(), 1);
    }

    #[tokio::test]
    async fn second_batch_reuses_cached_archive_lookup_without_a_new_remote_call() {
        let catalog = FakeCatalog::new();
        catalog.archives_by_checksum.lock().unwrap().insert(
            "abc".to_string(),
            vec![RemoteArchive {
                archive_id: 5,
                build_id: 100,
                filename: "foo.jar".into(),
                checksum: "abc".into(),
                checksum_type: "md5".into(),
                extensions: vec!["jar".into()],
            }],
        );
        catalog.builds.lock().unwrap().insert(100, build_info(100));

        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(catalog, &dir);

        let mut entries = IndexMap::new();
        entries.insert(Checksum::new(ChecksumType::Md5, "abc", "foo.jar"), vec!["foo.jar".to_string()]);
        resolver.resolve_batch(entries.clone(), &[]).await.unwrap();
        resolver.resolve_batch(entries, &[]).await.unwrap();
        let assembler = resolver.into_assembler();
        assert_eq!(assembler.found().len(), 1);
    }

    #[tokio::test]
    async fn errored_filenames_each_get_their_own_bucket_zero_entry() {
        let catalog = FakeCatalog::new();
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(catalog, &dir);

        resolver.resolve_batch(IndexMap::new(), &["a.jar".to_string(), "b.jar".to_string()]).await.unwrap();

        let assembler = resolver.into_assembler();
        let bucket0 = &assembler.all()[0].1;
        assert_eq!(bucket0.archives.len(), 2);
    }
}
