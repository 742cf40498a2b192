//! `ChecksumGate` — filters the analyzer's checksum stream before it reaches
//! the resolver (spec.md §4.1).
//!
//! Two independent filters apply, in order:
//! 1. Empty-digest check: a checksum equal to the empty-input digest for its
//!    algorithm carries no content and is dropped.
//! 2. Extension whitelist: at least one of the checksum's filenames must end
//!    with a recognized archive extension or `.rpm`.

use std::collections::HashSet;

use buildfinder_model::{Checksum, ChecksumType};

/// Outcome of running a `(Checksum, filenames)` pair through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Accepted; `is_rpm` says which of the two downstream partitions it
    /// belongs to (spec.md §4.1 "rpmEntries vs archiveEntries").
    Accept { is_rpm: bool },
    /// `value` equals the empty-input digest for `checksum_type`.
    SkipEmptyDigest,
    /// No filename ended with a whitelisted extension or `.rpm`.
    SkipNoExtensionMatch,
}

impl GateDecision {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accept { .. })
    }
}

/// Filters incoming checksums by empty-digest and extension whitelist.
///
/// Constructed once per resolver run from the union of the remote catalog's
/// known archive-type extensions and any configured whitelist (spec.md
/// §4.1); an empty configured whitelist means "accept every extension the
/// catalog knows".
#[derive(Debug, Clone)]
pub struct ChecksumGate {
    archive_extensions: HashSet<String>,
}

impl ChecksumGate {
    /// Build the gate's extension whitelist.
    ///
    /// `catalog_extensions` is the set of archive-type extensions known to
    /// the remote catalog (e.g. KOJI's archive-type map). `configured` is
    /// the user's `archiveExtensions` config list; when empty, every
    /// catalog extension is accepted (spec.md §4.1).
    #[must_use]
    pub fn new<I, J>(catalog_extensions: I, configured: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let catalog_extensions: HashSet<String> = catalog_extensions
            .into_iter()
            .map(|e| normalize_extension(&e))
            .collect();
        let configured: HashSet<String> = configured
            .into_iter()
            .map(|e| normalize_extension(&e))
            .collect();

        let archive_extensions = if configured.is_empty() {
            catalog_extensions
        } else {
            catalog_extensions.union(&configured).cloned().collect()
        };

        Self { archive_extensions }
    }

    /// Decide whether `checksum` (with its reported `filenames`) should pass
    /// through to remote resolution.
    ///
    /// Per spec.md §9's open question on `shouldSkipChecksum`, the only
    /// externally meaningful contract here is which [`GateDecision`] is
    /// returned; callers should not infer anything from the absence of a
    /// boolean "skip" return value.
    #[must_use]
    pub fn evaluate(&self, checksum: &Checksum, filenames: &[String]) -> GateDecision {
        if checksum.is_empty_digest() {
            tracing::debug!(
                checksum_type = %checksum.checksum_type,
                filename = %checksum.filename,
                "skipping checksum: empty digest"
            );
            return GateDecision::SkipEmptyDigest;
        }

        let is_rpm = filenames.iter().any(|f| f.ends_with(".rpm"));
        let matches = is_rpm
            || filenames
                .iter()
                .any(|f| self.has_whitelisted_extension(f));

        if !matches {
            tracing::debug!(
                checksum_value = %checksum.value,
                "skipping checksum: no whitelisted extension match"
            );
            return GateDecision::SkipNoExtensionMatch;
        }

        GateDecision::Accept { is_rpm }
    }

    fn has_whitelisted_extension(&self, filename: &str) -> bool {
        self.archive_extensions.iter().any(|ext| {
            filename
                .strip_suffix(ext.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn normalize_extension(ext: &str) -> String {
    if let Some(stripped) = ext.strip_prefix('.') {
        stripped.to_string()
    } else {
        ext.to_string()
    }
}

/// Partition gate-accepted entries into RPM and archive buckets (spec.md
/// §4.1). Skipped entries are dropped and not reported by this function;
/// callers that need skip accounting should call [`ChecksumGate::evaluate`]
/// directly.
pub fn partition<'a>(
    gate: &ChecksumGate,
    entries: impl IntoIterator<Item = (&'a Checksum, &'a [String])>,
) -> (Vec<&'a Checksum>, Vec<&'a Checksum>) {
    let mut rpm_entries = Vec::new();
    let mut archive_entries = Vec::new();

    for (checksum, filenames) in entries {
        match gate.evaluate(checksum, filenames) {
            GateDecision::Accept { is_rpm: true } => rpm_entries.push(checksum),
            GateDecision::Accept { is_rpm: false } => archive_entries.push(checksum),
            GateDecision::SkipEmptyDigest | GateDecision::SkipNoExtensionMatch => {}
        }
    }

    (rpm_entries, archive_entries)
}

/// Checksum types whose remote resolution is currently wired (spec.md §6:
/// "selector currently resolves only md5 against remotes").
#[must_use]
pub fn is_remote_resolvable(checksum_type: ChecksumType) -> bool {
    matches!(checksum_type, ChecksumType::Md5)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ChecksumGate {
        ChecksumGate::new(["jar".to_string(), "zip".to_string()], Vec::<String>::new())
    }

    #[test]
    fn empty_digest_is_skipped() {
        let g = gate();
        let c = Checksum::new(ChecksumType::Md5, ChecksumType::Md5.empty_digest(), "foo.jar");
        assert_eq!(g.evaluate(&c, &["foo.jar".to_string()]), GateDecision::SkipEmptyDigest);
    }

    #[test]
    fn unwhitelisted_extension_is_skipped() {
        let g = gate();
        let c = Checksum::new(ChecksumType::Md5, "abc", "readme.txt");
        assert_eq!(
            g.evaluate(&c, &["readme.txt".to_string()]),
            GateDecision::SkipNoExtensionMatch
        );
    }

    #[test]
    fn whitelisted_archive_extension_is_accepted_as_archive() {
        let g = gate();
        let c = Checksum::new(ChecksumType::Md5, "abc", "foo.jar");
        assert_eq!(
            g.evaluate(&c, &["foo.jar".to_string()]),
            GateDecision::Accept { is_rpm: false }
        );
    }

    #[test]
    fn rpm_filename_is_accepted_regardless_of_whitelist() {
        let g = ChecksumGate::new(Vec::<String>::new(), Vec::<String>::new());
        let c = Checksum::new(ChecksumType::Md5, "abc", "foo-1-1.noarch.rpm");
        assert_eq!(
            g.evaluate(&c, &["foo-1-1.noarch.rpm".to_string()]),
            GateDecision::Accept { is_rpm: true }
        );
    }

    #[test]
    fn empty_configured_list_defaults_to_every_catalog_extension() {
        let g = ChecksumGate::new(["zip".to_string()], Vec::<String>::new());
        let c = Checksum::new(ChecksumType::Md5, "abc", "foo.zip");
        assert!(g.evaluate(&c, &["foo.zip".to_string()]).is_accepted());
    }

    #[test]
    fn configured_extensions_union_with_catalog_extensions() {
        let g = ChecksumGate::new(["zip".to_string()], ["tar.gz".to_string()]);
        let c = Checksum::new(ChecksumType::Md5, "abc", "foo.tar.gz");
        assert!(g.evaluate(&c, &["foo.tar.gz".to_string()]).is_accepted());
    }

    #[test]
    fn partition_splits_rpm_from_archive_and_drops_skipped() {
        let g = gate();
        let empty = Checksum::new(ChecksumType::Md5, ChecksumType::Md5.empty_digest(), "e");
        let archive = Checksum::new(ChecksumType::Md5, "a1", "foo.jar");
        let rpm = Checksum::new(ChecksumType::Md5, "a2", "foo-1-1.noarch.rpm");
        let names_empty = [String::new()];
        let names_archive = ["foo.jar".to_string()];
        let names_rpm = ["foo-1-1.noarch.rpm".to_string()];
        let entries: Vec<(&Checksum, &[String])> = vec![
            (&empty, &names_empty[..]),
            (&archive, &names_archive[..]),
            (&rpm, &names_rpm[..]),
        ];
        let (rpms, archives) = partition(&g, entries);
        assert_eq!(rpms.len(), 1);
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].value, "a1");
        assert_eq!(rpms[0].value, "a2");
    }

    proptest::proptest! {
        #[test]
        fn gate_never_accepts_non_whitelisted_non_rpm(ext in "[a-z]{1,5}") {
            let g = ChecksumGate::new(["jar".to_string()], Vec::<String>::new());
            if ext != "jar" {
                let filename = format!("foo.{ext}");
                let c = Checksum::new(ChecksumType::Md5, "abc", filename.clone());
                let decision = g.evaluate(&c, &[filename]);
                prop_assert_eq!(decision, GateDecision::SkipNoExtensionMatch);
            }
        }
    }
}
