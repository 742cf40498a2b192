//! Command-line interface for `buildfinder`.
//!
//! Wires `Config` discovery, `CacheLayer`, the configured `RemoteCatalog`
//! backend(s), and `Resolver` together behind two subcommands: `resolve`
//! (the real work) and `doctor` (preflight checks), mirroring the teacher's
//! split between its orchestrator-wiring CLI and its doctor command.

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use buildfinder_cache::CacheLayer;
use buildfinder_catalog::{KojiCatalog, PncCatalog, PncExtras, RemoteCatalog};
use buildfinder_config::{CliOverrides, Config};
use buildfinder_doctor::DoctorCommand;
use buildfinder_engine::Resolver;
use buildfinder_model::{BuildSystem, Checksum, ChecksumType};

#[derive(Parser)]
#[command(name = "buildfinder", version, about = "Resolve distribution artifact provenance against KOJI and PNC")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a checksum manifest against the configured build systems.
    Resolve(ResolveArgs),
    /// Validate configuration and environment before a real run.
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Path to a `buildfinder.toml` config file; otherwise discovered by walking up from cwd.
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,
    #[arg(long)]
    pub cache_dir: Option<Utf8PathBuf>,
    #[arg(long)]
    pub koji_hub_url: Option<String>,
    #[arg(long)]
    pub pnc_url: Option<String>,
    #[arg(long)]
    pub koji_num_threads: Option<usize>,
    #[arg(long)]
    pub koji_multicall_size: Option<usize>,
    #[arg(long)]
    pub log_json: bool,
    /// Newline-delimited JSON checksum manifest; a line containing a bare
    /// JSON `null` ends the manifest early.
    #[arg(long)]
    pub input: Utf8PathBuf,
    /// Where to write the resolved build map, as JSON.
    #[arg(long)]
    pub output: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,
    #[arg(long)]
    pub koji_hub_url: Option<String>,
    #[arg(long)]
    pub pnc_url: Option<String>,
    /// Treat warnings as failures for exit-code purposes.
    #[arg(long)]
    pub strict: bool,
    #[arg(long)]
    pub log_json: bool,
}

/// Run the parsed CLI, returning a process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Resolve(args) => run_resolve(args).await.map(|()| 0),
        Command::Doctor(args) => run_doctor(args),
    }
}

fn overrides_from_resolve(args: &ResolveArgs) -> CliOverrides {
    CliOverrides {
        config_path: args.config.clone(),
        cache_dir: args.cache_dir.clone(),
        koji_hub_url: args.koji_hub_url.clone(),
        pnc_url: args.pnc_url.clone(),
        koji_num_threads: args.koji_num_threads,
        koji_multicall_size: args.koji_multicall_size,
        log_json: Some(args.log_json),
    }
}

async fn run_resolve(args: ResolveArgs) -> Result<()> {
    let overrides = overrides_from_resolve(&args);
    let config = Config::discover(&overrides).context("loading configuration")?;
    let _ = buildfinder_utils::logging::init_tracing(config.log_json);

    let cache = CacheLayer::open(&config.cache_dir).context("opening cache directory")?;
    let (catalog, pnc_extras) = build_catalog(&config)?;

    let mut resolver = Resolver::new(catalog, pnc_extras, cache, config);
    let (entries, errored_files) = read_manifest(&args.input)?;

    tracing::info!(
        checksums = entries.len(),
        errored_files = errored_files.len(),
        "resolving checksum manifest"
    );

    resolver.resolve_batch(entries, &errored_files).await.context("resolving checksum manifest")?;

    let assembler = resolver.into_assembler();
    let output = ResolveOutput {
        builds: assembler
            .all()
            .iter()
            .map(|(key, build)| ResolvedEntry {
                build_system: key.system.to_string(),
                build_id: key.id,
                build: build.clone(),
            })
            .collect(),
        found_checksums: assembler.found_checksums().len(),
        not_found_checksums: assembler.not_found_checksums().len(),
    };

    let rendered = serde_json::to_string_pretty(&output).context("serializing resolved output")?;
    std::fs::write(&args.output, rendered).with_context(|| format!("writing {}", args.output))?;

    tracing::info!(
        builds = output.builds.len(),
        found = output.found_checksums,
        not_found = output.not_found_checksums,
        "resolution complete"
    );

    Ok(())
}

fn run_doctor(args: DoctorArgs) -> Result<i32> {
    let overrides = CliOverrides {
        config_path: args.config.clone(),
        koji_hub_url: args.koji_hub_url.clone(),
        pnc_url: args.pnc_url.clone(),
        log_json: Some(args.log_json),
        ..Default::default()
    };
    let config = Config::discover(&overrides).context("loading configuration")?;
    let _ = buildfinder_utils::logging::init_tracing(config.log_json);

    let doctor = DoctorCommand::new(config);
    let output = doctor.run(args.strict)?;

    let rendered = serde_json::to_string_pretty(&output).context("serializing doctor output")?;
    println!("{rendered}");

    Ok(if output.ok { 0 } else { 1 })
}

/// Construct the `RemoteCatalog` backend(s) for the configured build systems.
///
/// When both KOJI and PNC are enabled, KOJI is the primary catalog (the
/// `findBuilds` branch) and PNC is only consulted through `PncExtras` in the
/// `findBuildsPnc` branch, per spec.md §4.6. When only PNC is enabled, the
/// same `PncCatalog` instance serves both roles; its `RemoteCatalog` methods
/// outside `get_builds`/`list_archives_by_build` are no-ops in that case.
fn build_catalog(config: &Config) -> Result<(Arc<dyn RemoteCatalog>, Option<Arc<dyn PncExtras>>)> {
    let pnc: Option<Arc<PncCatalog>> = match &config.pnc_url {
        Some(url) => Some(Arc::new(PncCatalog::new(url.clone())?)),
        None => None,
    };

    if config.build_systems.contains(&BuildSystem::Koji) {
        let koji = KojiCatalog::new(
            config.koji_hub_url.clone().context("koji_hub_url missing despite KOJI being enabled")?,
            config.koji_multicall_size,
        )?;
        let catalog: Arc<dyn RemoteCatalog> = Arc::new(koji);
        let pnc_extras: Option<Arc<dyn PncExtras>> = pnc.map(|p| -> Arc<dyn PncExtras> { p });
        return Ok((catalog, pnc_extras));
    }

    let pnc = pnc.context("no build system configured: enable koji or pnc in build_systems")?;
    let catalog: Arc<dyn RemoteCatalog> = pnc.clone();
    let pnc_extras: Option<Arc<dyn PncExtras>> = Some(pnc);
    Ok((catalog, pnc_extras))
}

#[derive(Deserialize)]
struct ManifestLine {
    #[serde(rename = "type", default)]
    checksum_type: Option<ChecksumType>,
    value: Option<String>,
    filename: String,
}

/// Read a newline-delimited JSON checksum manifest, splitting entries that
/// carry a digest from filenames the analyzer failed to checksum. A line
/// whose JSON value is a bare `null` ends the manifest early.
fn read_manifest(path: &Utf8PathBuf) -> Result<(IndexMap<Checksum, Vec<String>>, Vec<String>)> {
    let file = std::fs::File::open(path).with_context(|| format!("opening manifest {path}"))?;
    let reader = BufReader::new(file);

    let mut entries: IndexMap<Checksum, Vec<String>> = IndexMap::new();
    let mut errored_files = Vec::new();

    for line in reader.lines() {
        let line = line.with_context(|| format!("reading manifest {path}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: serde_json::Value = serde_json::from_str(&line).context("parsing manifest line")?;
        if raw.is_null() {
            break;
        }
        let entry: ManifestLine = serde_json::from_value(raw).context("parsing manifest entry")?;
        match entry.value {
            Some(digest) => {
                let checksum_type = entry.checksum_type.unwrap_or(ChecksumType::Md5);
                let checksum = Checksum::new(checksum_type, digest, entry.filename.clone());
                entries.entry(checksum).or_default().push(entry.filename);
            }
            None => errored_files.push(entry.filename),
        }
    }

    Ok((entries, errored_files))
}

#[derive(Serialize)]
struct ResolvedEntry {
    build_system: String,
    build_id: i64,
    build: buildfinder_model::Build,
}

#[derive(Serialize)]
struct ResolveOutput {
    builds: Vec<ResolvedEntry>,
    found_checksums: usize,
    not_found_checksums: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_digest_and_errored_lines_and_stops_at_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("manifest.ndjson")).unwrap();
        std::fs::write(
            &path,
            concat!(
                r#"{"type":"md5","value":"abc","filename":"foo.jar"}"#,
                "\n",
                r#"{"value":null,"filename":"unreadable.bin"}"#,
                "\n",
                "null\n",
                r#"{"type":"md5","value":"ignored","filename":"after-sentinel.jar"}"#,
                "\n",
            ),
        )
        .unwrap();

        let (entries, errored) = read_manifest(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(errored, vec!["unreadable.bin".to_string()]);
        assert!(entries.keys().any(|c| c.value == "abc"));
    }

    #[test]
    fn build_catalog_requires_at_least_one_backend() {
        let mut config = Config::default();
        config.build_systems.clear();
        config.koji_hub_url = None;
        config.pnc_url = None;
        assert!(build_catalog(&config).is_err());
    }

    #[test]
    fn build_catalog_selects_koji_as_primary_when_both_enabled() {
        let mut config = Config::default();
        config.build_systems = vec![BuildSystem::Koji, BuildSystem::Pnc];
        config.koji_hub_url = Some("https://koji.example.com/kojihub".to_string());
        config.pnc_url = Some("https://pnc.example.com".to_string());
        let (catalog, pnc_extras) = build_catalog(&config).unwrap();
        assert_eq!(catalog.name(), "koji");
        assert!(pnc_extras.is_some());
    }
}
