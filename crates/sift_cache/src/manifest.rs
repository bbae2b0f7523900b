//! The persisted cache document.
//!
//! One JSON file per project with three sections: `tests` (per-module cache
//! entries), `artifacts` (compiled-artifact payload digests), and `ledger`
//! (per-transaction coverage rows). All maps are `BTreeMap`s so the document
//! is deterministic and diffs cleanly between runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sift_common::Digest;

use crate::error::CacheError;

/// Current format version of the persisted document.
///
/// A document with any other version is treated like a corrupt one: the
/// session starts from an empty cache.
pub const MANIFEST_VERSION: u32 = 1;

/// Per-artifact coverage data for one transaction, keyed by artifact name.
///
/// The region values are owned by the coverage collaborator and opaque to
/// this crate; only the artifact-name keys participate in invalidation.
pub type CoverageMap = BTreeMap<String, serde_json::Value>;

/// The full persisted cache state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version; mismatches invalidate the whole document.
    pub version: u32,

    /// Cache entries, keyed by test-module path.
    pub tests: BTreeMap<PathBuf, CachedTest>,

    /// Payload digest per compiled artifact. Artifacts with an empty payload
    /// are never present: they cannot execute, so they cannot invalidate.
    pub artifacts: BTreeMap<String, Digest>,

    /// Coverage rows, keyed by transaction id.
    pub ledger: BTreeMap<String, CoverageMap>,
}

/// One cached test-module entry.
///
/// Entries are append/evict only: a changed module gets a wholly new entry,
/// never an in-place digest update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTest {
    /// Combined cache key: the module's structural fingerprint folded with
    /// the shared-setup modules in scope.
    pub digest: Digest,

    /// Whether the module runs under an isolation discipline that reverts
    /// its side effects. Only isolated modules are ever skipped.
    pub isolated: bool,

    /// Transaction ids produced the last time this module ran, in order.
    pub tx_ids: Vec<String>,
}

impl Manifest {
    /// Creates an empty manifest at the current format version.
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            tests: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            ledger: BTreeMap::new(),
        }
    }

    /// Loads a manifest from `path`, returning `None` if the file is
    /// missing, unreadable, unparsable, or from another format version.
    ///
    /// Fail-safe: any problem means starting from an empty cache rather
    /// than failing the session.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let manifest: Manifest = serde_json::from_str(&content).ok()?;
        (manifest.version == MANIFEST_VERSION).then_some(manifest)
    }

    /// Saves the manifest to `path` as pretty-printed JSON.
    ///
    /// Creates parent directories as needed and writes through a temp file
    /// plus rename, so an interrupted save never leaves a truncated
    /// document behind.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manifest_is_empty() {
        let m = Manifest::new();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.tests.is_empty());
        assert!(m.artifacts.is_empty());
        assert!(m.ledger.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.json");

        let mut m = Manifest::new();
        m.tests.insert(
            PathBuf::from("tests/test_token.py"),
            CachedTest {
                digest: Digest::from_bytes(b"combined"),
                isolated: true,
                tx_ids: vec!["0xaa".to_string(), "0xbb".to_string()],
            },
        );
        m.artifacts
            .insert("Token".to_string(), Digest::from_bytes(b"bytecode"));
        let mut coverage = CoverageMap::new();
        coverage.insert("Token".to_string(), serde_json::json!({"0": [1, 2, 3]}));
        m.ledger.insert("0xaa".to_string(), coverage);
        m.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.tests.len(), 1);
        let entry = &loaded.tests[&PathBuf::from("tests/test_token.py")];
        assert!(entry.isolated);
        assert_eq!(entry.tx_ids, vec!["0xaa", "0xbb"]);
        assert_eq!(loaded.artifacts.len(), 1);
        assert_eq!(loaded.ledger["0xaa"]["Token"], serde_json::json!({"0": [1, 2, 3]}));
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::load(&dir.path().join("tests.json")).is_none());
    }

    #[test]
    fn load_corrupt_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert!(Manifest::load(&path).is_none());
    }

    #[test]
    fn load_version_mismatch_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.json");
        let mut m = Manifest::new();
        m.version = MANIFEST_VERSION + 1;
        let json = serde_json::to_string(&m).unwrap();
        std::fs::write(&path, json).unwrap();
        assert!(Manifest::load(&path).is_none());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build").join("cache").join("tests.json");
        Manifest::new().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.json");
        Manifest::new().save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn document_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.json");
        let path_b = dir.path().join("b.json");

        let mut m = Manifest::new();
        m.artifacts
            .insert("Zed".to_string(), Digest::from_bytes(b"z"));
        m.artifacts
            .insert("Alpha".to_string(), Digest::from_bytes(b"a"));
        m.save(&path_a).unwrap();
        m.save(&path_b).unwrap();

        let a = std::fs::read_to_string(&path_a).unwrap();
        let b = std::fs::read_to_string(&path_b).unwrap();
        assert_eq!(a, b);
        // BTreeMap keys serialize sorted.
        assert!(a.find("Alpha").unwrap() < a.find("Zed").unwrap());
    }
}
