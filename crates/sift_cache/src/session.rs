//! The per-run cache session.
//!
//! One `SessionCache` spans a test run: it loads persisted state, prunes and
//! invalidates entries, answers skip queries while the driver works through
//! modules, accepts freshly recorded results, and persists the merged state
//! exactly once. The session protocol is strictly sequential; there is no
//! concurrent-caller contract.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use sift_common::Digest;
use sift_fingerprint::{combine, Fingerprinter, FingerprintError, ProjectLayout, SetupRegistry};

use crate::artifact::{current_digests, detect_changes, ArtifactProvider};
use crate::error::CacheError;
use crate::invalidate::{evict_stale, invalidate};
use crate::ledger::CoverageLedger;
use crate::manifest::{CachedTest, Manifest};

/// A scoped cache session for one test run.
///
/// Dropping the session flushes state to disk if [`save`](Self::save) was
/// not already called, so every exit path persists whatever was recorded
/// before it. An explicit `save` disarms that flush; both it and any later
/// `save` calls are no-ops.
pub struct SessionCache<L: CoverageLedger> {
    manifest_path: PathBuf,
    layout: ProjectLayout,
    setups: SetupRegistry,
    tests: BTreeMap<PathBuf, CachedTest>,
    artifacts: BTreeMap<String, Digest>,
    ledger: L,
    skipped: BTreeSet<PathBuf>,
    armed: bool,
}

impl<L: CoverageLedger> SessionCache<L> {
    /// Opens a session: loads persisted state, prunes stale entries, and
    /// runs artifact-driven invalidation.
    ///
    /// Shared-setup modules are registered first; every dependent digest
    /// computed afterwards folds in the ones in scope, so a setup that
    /// cannot be fingerprinted fails the load. Everything else is
    /// fail-safe: a missing or corrupt cache document starts empty, and a
    /// cached entry that no longer fingerprints cleanly is dropped
    /// (treated as changed) rather than surfaced.
    ///
    /// Retained ledger rows are forwarded to the coverage collaborator
    /// before the session starts answering queries.
    pub fn load(
        manifest_path: impl Into<PathBuf>,
        layout: ProjectLayout,
        setup_paths: &[PathBuf],
        artifact_provider: &dyn ArtifactProvider,
        mut ledger: L,
    ) -> Result<Self, FingerprintError> {
        let manifest_path = manifest_path.into();

        let mut setups = SetupRegistry::new();
        let fingerprinter = Fingerprinter::new(&layout);
        for path in setup_paths {
            setups.register(path, fingerprinter.fingerprint(path)?);
        }

        let manifest = Manifest::load(&manifest_path).unwrap_or_default();

        // Keep only entries whose file still exists and whose combined
        // digest matches current content.
        let mut tests = BTreeMap::new();
        for (path, entry) in manifest.tests {
            if !path.exists() {
                continue;
            }
            match fingerprinter.fingerprint(&path) {
                Ok(digest) if combine(digest, &path, &setups) == entry.digest => {
                    tests.insert(path, entry);
                }
                _ => {}
            }
        }

        let artifacts = current_digests(&artifact_provider.artifacts());
        let changed = detect_changes(&manifest.artifacts, &artifacts);
        let inv = invalidate(&changed, manifest.ledger);
        evict_stale(&mut tests, &inv.stale_txs);
        for (tx_id, coverage) in inv.retained {
            ledger.record_row(&tx_id, coverage);
        }

        Ok(Self {
            manifest_path,
            layout,
            setups,
            tests,
            artifacts,
            ledger,
            skipped: BTreeSet::new(),
            armed: true,
        })
    }

    /// Returns `true` if the module's cached entry is still valid and the
    /// module is isolated, marking it skipped for this session.
    ///
    /// A skipped module's prior transaction ids stay untouched: its coverage
    /// contribution is neither re-derived nor discarded. Any other outcome
    /// (no entry, stale entry already pruned, not isolated) means the driver
    /// must execute the module.
    pub fn should_skip(&mut self, module_path: &Path) -> bool {
        match self.tests.get(module_path) {
            Some(entry) if entry.isolated => {
                self.skipped.insert(module_path.to_path_buf());
                true
            }
            _ => false,
        }
    }

    /// Records the result of executing a module.
    ///
    /// If the module was skipped this session the call is a no-op, so a
    /// driver cannot overwrite a deliberately preserved entry with stale
    /// results. Otherwise the entry is replaced wholesale: fresh combined
    /// digest, the isolation flag as declared for this run, and the new
    /// transaction list. A fingerprint failure propagates and leaves the
    /// module uncached.
    pub fn finish(
        &mut self,
        module_path: &Path,
        isolated: bool,
        tx_ids: Vec<String>,
    ) -> Result<(), FingerprintError> {
        if self.skipped.contains(module_path) {
            return Ok(());
        }
        let fingerprinter = Fingerprinter::new(&self.layout);
        let digest = combine(
            fingerprinter.fingerprint(module_path)?,
            module_path,
            &self.setups,
        );
        self.tests.insert(
            module_path.to_path_buf(),
            CachedTest {
                digest,
                isolated,
                tx_ids,
            },
        );
        Ok(())
    }

    /// Persists the session state: entries, current artifact digests, and
    /// the coverage collaborator's full row set.
    ///
    /// Idempotent: the first successful call disarms both further explicit
    /// calls and the drop-time flush. A failed write leaves the session
    /// armed so the flush can retry.
    pub fn save(&mut self) -> Result<(), CacheError> {
        if !self.armed {
            return Ok(());
        }
        let manifest = Manifest {
            tests: self.tests.clone(),
            artifacts: self.artifacts.clone(),
            ledger: self.ledger.all_rows(),
            ..Manifest::new()
        };
        manifest.save(&self.manifest_path)?;
        self.armed = false;
        Ok(())
    }

    /// The cache entries currently held by the session.
    pub fn cached_tests(&self) -> &BTreeMap<PathBuf, CachedTest> {
        &self.tests
    }

    /// Modules marked skipped this session.
    pub fn skipped(&self) -> &BTreeSet<PathBuf> {
        &self.skipped
    }

    /// The current artifact digest table.
    pub fn artifact_digests(&self) -> &BTreeMap<String, Digest> {
        &self.artifacts
    }

    /// The coverage collaborator.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the coverage collaborator, for the coverage
    /// producer to record rows during the run.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }
}

impl<L: CoverageLedger> Drop for SessionCache<L> {
    fn drop(&mut self) {
        // Teardown flush. A write failure here is already reported by the
        // explicit save path; the run's results are simply not cached.
        if self.armed {
            let _ = self.save();
        }
    }
}
