//! The coverage-ledger collaborator interface.

use std::collections::BTreeMap;

use crate::manifest::CoverageMap;

/// External store of per-transaction coverage rows.
///
/// The session reads the full row set at load (after forwarding whichever
/// persisted rows survived invalidation into it) and again at persist, so
/// rows recorded by the coverage producer during the run are captured in the
/// saved document. The core never interprets region data; it only keys rows
/// by transaction id and artifact name.
pub trait CoverageLedger {
    /// All rows currently known to the collaborator.
    fn all_rows(&self) -> BTreeMap<String, CoverageMap>;

    /// Records (or replaces) the row for one transaction.
    fn record_row(&mut self, tx_id: &str, coverage: CoverageMap);
}

/// In-process ledger implementation.
///
/// Suitable for drivers that keep coverage in memory for the duration of a
/// session, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    rows: BTreeMap<String, CoverageMap>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows recorded.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows are recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl CoverageLedger for MemoryLedger {
    fn all_rows(&self) -> BTreeMap<String, CoverageMap> {
        self.rows.clone()
    }

    fn record_row(&mut self, tx_id: &str, coverage: CoverageMap) {
        self.rows.insert(tx_id.to_string(), coverage);
    }
}
