//! Layered configuration: CLI > config file > built-in defaults.
//!
//! Mirrors the teacher's `Config::discover` precedence model, generalized to
//! the options spec.md §6 lists, plus the ambient fields a real CLI needs
//! (cache directory, KOJI hub URL, PNC URL, auth env var names, JSON logging).

pub mod error;

pub use error::ConfigError;

use std::collections::BTreeMap;
use std::path::Path;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use buildfinder_model::{BuildSystem, ChecksumType};

const CONFIG_FILE_NAME: &str = "buildfinder.toml";
const DEFAULT_KOJI_NUM_THREADS: usize = 4;
const DEFAULT_KOJI_MULTICALL_SIZE: usize = 50;
const DEFAULT_KOJI_AUTH_ENV: &str = "BUILDFINDER_KOJI_TOKEN";
const DEFAULT_PNC_AUTH_ENV: &str = "BUILDFINDER_PNC_TOKEN";

/// Where a configuration value ultimately came from, for `doctor`/`resolve`
/// diagnostics (spec.md's ambient-stack expansion: operators need to know
/// why a run picked the thread count it did).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Default,
    ConfigFile,
    Cli,
}

/// CLI-supplied overrides, applied last (highest precedence).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<Utf8PathBuf>,
    pub cache_dir: Option<Utf8PathBuf>,
    pub koji_hub_url: Option<String>,
    pub pnc_url: Option<String>,
    pub koji_num_threads: Option<usize>,
    pub koji_multicall_size: Option<usize>,
    pub log_json: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    checksum_types: Option<Vec<ChecksumType>>,
    archive_types: Option<Vec<String>>,
    archive_extensions: Option<Vec<String>>,
    koji_num_threads: Option<usize>,
    koji_multicall_size: Option<usize>,
    build_systems: Option<Vec<BuildSystem>>,
    pnc_url: Option<String>,
    koji_hub_url: Option<String>,
    cache_dir: Option<Utf8PathBuf>,
    koji_auth_env: Option<String>,
    pnc_auth_env: Option<String>,
    log_json: Option<bool>,
}

/// The fully resolved configuration consumed by the resolution engine
/// (spec.md §6) plus the ambient fields a runnable binary needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Digest algorithms to consider. Only `Md5` is resolved against remotes
    /// today (spec.md §6); the rest are carried for forward compatibility.
    pub checksum_types: Vec<ChecksumType>,
    /// Whitelist of catalog archive-type names; empty = all.
    pub archive_types: Vec<String>,
    /// Whitelist of filename extensions; empty = all known.
    pub archive_extensions: Vec<String>,
    pub koji_num_threads: usize,
    pub koji_multicall_size: usize,
    pub build_systems: Vec<BuildSystem>,
    pub pnc_url: Option<String>,
    pub koji_hub_url: Option<String>,
    pub cache_dir: Utf8PathBuf,
    /// Name of the environment variable holding the KOJI auth token; the
    /// token itself is never read into this struct.
    pub koji_auth_env: String,
    pub pnc_auth_env: String,
    pub log_json: bool,
    pub sources: BTreeMap<&'static str, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let mut sources = BTreeMap::new();
        for field in [
            "checksum_types",
            "archive_types",
            "archive_extensions",
            "koji_num_threads",
            "koji_multicall_size",
            "build_systems",
            "pnc_url",
            "koji_hub_url",
            "cache_dir",
            "koji_auth_env",
            "pnc_auth_env",
            "log_json",
        ] {
            sources.insert(field, ConfigSource::Default);
        }

        Self {
            checksum_types: vec![ChecksumType::Md5],
            archive_types: Vec::new(),
            archive_extensions: Vec::new(),
            koji_num_threads: DEFAULT_KOJI_NUM_THREADS,
            koji_multicall_size: DEFAULT_KOJI_MULTICALL_SIZE,
            build_systems: vec![BuildSystem::Koji],
            pnc_url: None,
            koji_hub_url: None,
            cache_dir: buildfinder_utils::paths::cache_dir(),
            koji_auth_env: DEFAULT_KOJI_AUTH_ENV.to_string(),
            pnc_auth_env: DEFAULT_PNC_AUTH_ENV.to_string(),
            log_json: false,
            sources,
        }
    }
}

impl Config {
    /// Discover configuration starting from the current directory, applying
    /// `overrides` last.
    pub fn discover(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().unwrap_or_else(|_| ".".into());
        Self::discover_from(&start_dir, overrides)
    }

    /// Path-driven variant used by tests to avoid relying on process cwd.
    pub fn discover_from(start_dir: &Path, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| find_config_file(start_dir));

        if let Some(path) = &config_path {
            let file_config = Self::load_file(path)?;
            config.apply_file(file_config);
        }

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Utf8PathBuf) -> Result<FileConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.clone(), source })
    }

    fn apply_file(&mut self, file: FileConfig) {
        macro_rules! apply {
            ($field:ident) => {
                if let Some(value) = file.$field {
                    self.$field = value;
                    self.sources.insert(stringify!($field), ConfigSource::ConfigFile);
                }
            };
        }
        apply!(checksum_types);
        apply!(archive_types);
        apply!(archive_extensions);
        apply!(koji_num_threads);
        apply!(koji_multicall_size);
        apply!(build_systems);
        apply!(pnc_url);
        apply!(koji_hub_url);
        apply!(cache_dir);
        apply!(koji_auth_env);
        apply!(pnc_auth_env);
        apply!(log_json);
    }

    fn apply_overrides(&mut self, overrides: &CliOverrides) {
        macro_rules! apply {
            ($field:ident) => {
                if let Some(value) = overrides.$field.clone() {
                    self.$field = value;
                    self.sources.insert(stringify!($field), ConfigSource::Cli);
                }
            };
        }
        apply!(cache_dir);
        apply!(koji_hub_url);
        apply!(pnc_url);
        apply!(koji_num_threads);
        apply!(koji_multicall_size);
        apply!(log_json);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.koji_num_threads == 0 {
            return Err(ConfigError::Invalid("koji_num_threads must be at least 1".to_string()));
        }
        if self.koji_multicall_size == 0 {
            return Err(ConfigError::Invalid("koji_multicall_size must be at least 1".to_string()));
        }
        if self.build_systems.contains(&BuildSystem::Koji) && self.koji_hub_url.is_none() {
            return Err(ConfigError::Invalid(
                "koji_hub_url is required when KOJI is in build_systems".to_string(),
            ));
        }
        if self.build_systems.contains(&BuildSystem::Pnc) && self.pnc_url.is_none() {
            return Err(ConfigError::Invalid(
                "pnc_url is required when PNC is in build_systems".to_string(),
            ));
        }
        Ok(())
    }
}

fn find_config_file(start_dir: &Path) -> Option<Utf8PathBuf> {
    let mut dir = Utf8PathBuf::from_path_buf(start_dir.to_path_buf()).ok()?;
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
