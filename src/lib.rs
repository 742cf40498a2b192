//! `buildfinder` - resolves the upstream build provenance of distribution
//! artifacts against KOJI and PNC.
//!
//! This crate is a thin re-export surface; the actual work lives in the
//! `buildfinder-*` workspace members. `main.rs` only parses arguments and
//! invokes [`buildfinder_cli::run`].

pub use buildfinder_cache::{CacheError, CacheLayer};
pub use buildfinder_catalog::{CatalogError, FakeCatalog, KojiCatalog, PncCatalog, RemoteCatalog};
pub use buildfinder_config::{CliOverrides, Config, ConfigError};
pub use buildfinder_engine::{ResolveError, ResultAssembler, Resolver};
pub use buildfinder_gate::ChecksumGate;
pub use buildfinder_model::*;
pub use buildfinder_utils::BuildFinderError;

pub use buildfinder_cli::{Cli, Command, DoctorArgs, ResolveArgs};
