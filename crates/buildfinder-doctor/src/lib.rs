//! Preflight checks for a `buildfinder` run.
//!
//! Surfaces the same configuration problems the engine would otherwise only
//! discover mid-resolution (a missing KOJI hub URL, an unwritable cache
//! directory) before any remote calls are made.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use buildfinder_cache::CacheLayer;
use buildfinder_config::Config;
use buildfinder_model::BuildSystem;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorOutput {
    pub schema_version: String,
    pub emitted_at: DateTime<Utc>,
    pub ok: bool,
    pub checks: Vec<DoctorCheck>,
}

pub struct DoctorCommand {
    config: Config,
}

impl DoctorCommand {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all checks. In strict mode, warnings also fail the overall `ok`
    /// flag, for use in CI gating.
    pub fn run(&self, strict: bool) -> Result<DoctorOutput> {
        let mut checks = vec![
            self.check_koji_hub_url(),
            self.check_pnc_url(),
            self.check_cache_dir_writable(),
            self.check_koji_auth_env(),
            self.check_pnc_auth_env(),
            self.check_checksum_types(),
        ];

        checks.sort_by(|a, b| a.name.cmp(&b.name));

        let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
        let has_warn = checks.iter().any(|c| c.status == CheckStatus::Warn);
        let ok = !has_fail && (!strict || !has_warn);

        Ok(DoctorOutput {
            schema_version: "1".to_string(),
            emitted_at: Utc::now(),
            ok,
            checks,
        })
    }

    fn check_koji_hub_url(&self) -> DoctorCheck {
        let wants_koji = self.config.build_systems.contains(&BuildSystem::Koji);
        match (&self.config.koji_hub_url, wants_koji) {
            (Some(url), _) if url.starts_with("http://") || url.starts_with("https://") => DoctorCheck {
                name: "koji_hub_url".to_string(),
                status: CheckStatus::Pass,
                details: format!("KOJI hub reachable at {url}"),
            },
            (Some(url), _) => DoctorCheck {
                name: "koji_hub_url".to_string(),
                status: CheckStatus::Fail,
                details: format!("koji_hub_url '{url}' is not an http(s) URL"),
            },
            (None, true) => DoctorCheck {
                name: "koji_hub_url".to_string(),
                status: CheckStatus::Fail,
                details: "KOJI is in build_systems but koji_hub_url is not configured".to_string(),
            },
            (None, false) => DoctorCheck {
                name: "koji_hub_url".to_string(),
                status: CheckStatus::Pass,
                details: "KOJI is not configured, koji_hub_url not required".to_string(),
            },
        }
    }

    fn check_pnc_url(&self) -> DoctorCheck {
        let wants_pnc = self.config.build_systems.contains(&BuildSystem::Pnc);
        match (&self.config.pnc_url, wants_pnc) {
            (Some(url), _) if url.starts_with("http://") || url.starts_with("https://") => DoctorCheck {
                name: "pnc_url".to_string(),
                status: CheckStatus::Pass,
                details: format!("PNC endpoint reachable at {url}"),
            },
            (Some(url), _) => DoctorCheck {
                name: "pnc_url".to_string(),
                status: CheckStatus::Fail,
                details: format!("pnc_url '{url}' is not an http(s) URL"),
            },
            (None, true) => DoctorCheck {
                name: "pnc_url".to_string(),
                status: CheckStatus::Fail,
                details: "PNC is in build_systems but pnc_url is not configured".to_string(),
            },
            (None, false) => DoctorCheck {
                name: "pnc_url".to_string(),
                status: CheckStatus::Pass,
                details: "PNC is not configured, pnc_url not required".to_string(),
            },
        }
    }

    /// Mirrors the teacher's write-then-rename probe, against the cache
    /// directory instead of a project-local working directory.
    fn check_cache_dir_writable(&self) -> DoctorCheck {
        let dir = self.config.cache_dir.as_std_path();
        if let Err(e) = buildfinder_utils::paths::ensure_dir_all(dir) {
            return DoctorCheck {
                name: "cache_dir_writable".to_string(),
                status: CheckStatus::Fail,
                details: format!("cannot create cache directory {}: {e}", dir.display()),
            };
        }

        let probe = dir.join(".doctor_probe");
        match std::fs::write(&probe, b"probe") {
            Ok(()) => {
                let _ = std::fs::remove_file(&probe);
                DoctorCheck {
                    name: "cache_dir_writable".to_string(),
                    status: CheckStatus::Pass,
                    details: format!("{} is writable", dir.display()),
                }
            }
            Err(e) => DoctorCheck {
                name: "cache_dir_writable".to_string(),
                status: CheckStatus::Fail,
                details: format!("cannot write to cache directory {}: {e}", dir.display()),
            },
        }
    }

    /// Auth tokens are optional at the config layer (some KOJI/PNC
    /// deployments allow anonymous reads), so a missing env var only warns.
    fn check_koji_auth_env(&self) -> DoctorCheck {
        check_auth_env("koji_auth_env", &self.config.koji_auth_env)
    }

    fn check_pnc_auth_env(&self) -> DoctorCheck {
        check_auth_env("pnc_auth_env", &self.config.pnc_auth_env)
    }

    /// Only `md5` is resolvable against either remote today; configuring any
    /// other checksum type is harmless but will never produce a match.
    fn check_checksum_types(&self) -> DoctorCheck {
        let unsupported: Vec<String> = self
            .config
            .checksum_types
            .iter()
            .filter(|t| !matches!(t, buildfinder_model::ChecksumType::Md5))
            .map(|t| t.to_string())
            .collect();

        if unsupported.is_empty() {
            DoctorCheck {
                name: "checksum_types".to_string(),
                status: CheckStatus::Pass,
                details: "checksum_types contains only remote-resolvable types".to_string(),
            }
        } else {
            DoctorCheck {
                name: "checksum_types".to_string(),
                status: CheckStatus::Warn,
                details: format!(
                    "checksum_types configures {} which are never remote-resolvable; \
                     files hashed with them will always land in the not-found bucket",
                    unsupported.join(", ")
                ),
            }
        }
    }

    /// Report cache statistics for an already-opened cache, to be folded into
    /// the doctor output by callers that want it alongside the checks above.
    #[must_use]
    pub fn cache_summary(cache: &CacheLayer) -> Vec<(&'static str, usize, usize, usize)> {
        cache
            .stats()
            .into_iter()
            .map(|(name, stats)| (name, stats.hits, stats.misses, stats.writes))
            .collect()
    }
}

fn check_auth_env(name: &str, env_var: &str) -> DoctorCheck {
    if std::env::var(env_var).is_ok() {
        DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: format!("{env_var} is set"),
        }
    } else {
        DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: format!("{env_var} is not set; requests will be sent unauthenticated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildfinder_config::CliOverrides;

    fn config_with(overrides: CliOverrides) -> Config {
        let _guard = buildfinder_utils::paths::with_isolated_home();
        let dir = tempfile::tempdir().unwrap();
        Config::discover_from(dir.path(), &overrides).unwrap()
    }

    #[test]
    fn missing_koji_hub_url_fails_the_check() {
        // Config::discover already rejects this combination, so build the
        // struct directly to exercise the check in isolation.
        let mut config = Config::default();
        config.koji_hub_url = None;
        config.build_systems = vec![BuildSystem::Koji];
        let doctor = DoctorCommand::new(config);
        let check = doctor.check_koji_hub_url();
        assert_eq!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn configured_koji_hub_url_passes() {
        let config = config_with(CliOverrides {
            koji_hub_url: Some("https://koji.example.com/kojihub".to_string()),
            ..Default::default()
        });
        let doctor = DoctorCommand::new(config);
        let check = doctor.check_koji_hub_url();
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn pnc_not_configured_is_not_an_error() {
        let config = config_with(CliOverrides {
            koji_hub_url: Some("https://koji.example.com/kojihub".to_string()),
            ..Default::default()
        });
        let doctor = DoctorCommand::new(config);
        let check = doctor.check_pnc_url();
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn cache_dir_is_created_and_writable() {
        let config = config_with(CliOverrides {
            koji_hub_url: Some("https://koji.example.com/kojihub".to_string()),
            ..Default::default()
        });
        let doctor = DoctorCommand::new(config);
        let check = doctor.check_cache_dir_writable();
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn missing_auth_env_warns_not_fails() {
        let config = config_with(CliOverrides {
            koji_hub_url: Some("https://koji.example.com/kojihub".to_string()),
            ..Default::default()
        });
        let doctor = DoctorCommand::new(config);
        let check = doctor.check_koji_auth_env();
        assert_ne!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn run_sorts_checks_by_name() {
        let config = config_with(CliOverrides {
            koji_hub_url: Some("https://koji.example.com/kojihub".to_string()),
            ..Default::default()
        });
        let doctor = DoctorCommand::new(config);
        let output = doctor.run(false).unwrap();
        let names: Vec<_> = output.checks.iter().map(|c| c.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
