//! Data model for the build resolution engine.
//!
//! These types are the shared vocabulary between `buildfinder-gate`,
//! `buildfinder-cache`, `buildfinder-catalog`, `buildfinder-selectors`, and
//! `buildfinder-engine`. Nothing in this crate talks to the network or the
//! filesystem.

pub mod build;
pub mod build_system;
pub mod checksum;
pub mod remote;

pub use build::{ArchiveRef, Build, BuildInfo, BuildMap, BuildState, LocalArchive};
pub use build_system::{BuildSystem, BuildSystemKey};
pub use checksum::{Checksum, ChecksumType};
pub use remote::{Nvra, PncArtifact, PncQuality, RemoteArchive, RpmInfo, TaskInfo, TaskRequest};
