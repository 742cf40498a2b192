//! Checksum records produced by the distribution analyzer.

use serde::{Deserialize, Serialize};

/// Digest algorithm a [`Checksum`] was computed with.
///
/// Only [`ChecksumType::Md5`] is resolved against remotes today (spec §6,
/// §9 "Non-md5 checksum paths are ... not exercised end-to-end"); the other
/// variants exist so the type is total and future remotes can be wired in
/// without a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    Md5,
    Sha1,
    Sha256,
}

impl ChecksumType {
    /// Hex digest of the empty byte string under this algorithm.
    ///
    /// `ChecksumGate` uses this to recognize and skip analyzer entries whose
    /// digest is the empty-input digest rather than real content.
    #[must_use]
    pub const fn empty_digest(self) -> &'static str {
        match self {
            Self::Md5 => "d41d8cd98f00b204e9800998ecf8427e",
            Self::Sha1 => "da39a3ee5e6b4b0d3255bfef95601890afd80709",
            Self::Sha256 => "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single content checksum as emitted by the distribution analyzer.
///
/// Immutable once constructed; the analyzer is the only producer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(rename = "type")]
    pub checksum_type: ChecksumType,
    /// Hex-encoded digest value.
    pub value: String,
    pub filename: String,
}

impl Checksum {
    #[must_use]
    pub fn new(checksum_type: ChecksumType, value: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            checksum_type,
            value: value.into(),
            filename: filename.into(),
        }
    }

    /// True when `value` is the empty-input digest for this checksum's type.
    #[must_use]
    pub fn is_empty_digest(&self) -> bool {
        self.value.eq_ignore_ascii_case(self.checksum_type.empty_digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest_detection_is_case_insensitive() {
        let c = Checksum::new(ChecksumType::Md5, "D41D8CD98F00B204E9800998ECF8427E", "foo.jar");
        assert!(c.is_empty_digest());
    }

    #[test]
    fn non_empty_digest_is_not_flagged() {
        let c = Checksum::new(ChecksumType::Md5, "abc123", "foo.jar");
        assert!(!c.is_empty_digest());
    }

    #[test]
    fn roundtrips_through_json() {
        let c = Checksum::new(ChecksumType::Sha256, "abc", "foo.jar");
        let s = serde_json::to_string(&c).unwrap();
        let back: Checksum = serde_json::from_str(&s).unwrap();
        assert_eq!(c, back);
    }
}
