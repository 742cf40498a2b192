//! Identity of the remote build system a [`crate::Build`] was resolved from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which remote catalog a build was resolved against.
///
/// `None` names the synthetic bucket for unresolved content; it is never
/// returned by a real [`crate::remote::RemoteArchive`] lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildSystem {
    None,
    Koji,
    Pnc,
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Koji => write!(f, "koji"),
            Self::Pnc => write!(f, "pnc"),
        }
    }
}

/// Uniquely identifies a [`crate::Build`]: the pair `(system, id)`.
///
/// `(None, 0)` is the single synthetic bucket described in spec.md §3/§6 that
/// collects content no upstream build could be found for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildSystemKey {
    pub system: BuildSystem,
    pub id: i64,
}

impl BuildSystemKey {
    #[must_use]
    pub const fn new(system: BuildSystem, id: i64) -> Self {
        Self { system, id }
    }

    /// The synthetic `(None, 0)` key that always exists in the Resolver's output map.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::new(BuildSystem::None, 0)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.id == 0 && matches!(self.system, BuildSystem::None)
    }
}

impl fmt::Display for BuildSystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_key_is_recognized() {
        assert!(BuildSystemKey::not_found().is_not_found());
        assert!(!BuildSystemKey::new(BuildSystem::Koji, 0).is_not_found());
        assert!(!BuildSystemKey::new(BuildSystem::None, 5).is_not_found());
    }
}
