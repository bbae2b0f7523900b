//! Invalidation of stale transactions and the cache entries that recorded
//! them.
//!
//! A changed artifact poisons every transaction whose coverage row touches
//! it, and a stale transaction in turn poisons every cached test that ever
//! recorded it. Eviction is whole-entry: one stale transaction is enough,
//! regardless of the module's own content digest.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::manifest::{CachedTest, CoverageMap};

/// Result of an invalidation pass over the coverage ledger.
#[derive(Debug, Clone)]
pub struct Invalidation {
    /// Transactions whose coverage touched a changed artifact.
    pub stale_txs: BTreeSet<String>,

    /// Ledger rows that survive, to be forwarded to the coverage
    /// collaborator unchanged.
    pub retained: BTreeMap<String, CoverageMap>,
}

/// Partitions the ledger into stale and retained rows.
///
/// With no changed artifacts every row is retained and nothing is stale;
/// this is the common case. Otherwise each row is judged on its own artifact
/// set in a single linear pass, with no ordering dependency between rows.
pub fn invalidate(
    changed: &BTreeSet<String>,
    ledger: BTreeMap<String, CoverageMap>,
) -> Invalidation {
    if changed.is_empty() {
        return Invalidation {
            stale_txs: BTreeSet::new(),
            retained: ledger,
        };
    }

    let mut stale_txs = BTreeSet::new();
    let mut retained = BTreeMap::new();
    for (tx_id, coverage) in ledger {
        if coverage.keys().any(|artifact| changed.contains(artifact)) {
            stale_txs.insert(tx_id);
        } else {
            retained.insert(tx_id, coverage);
        }
    }
    Invalidation { stale_txs, retained }
}

/// Evicts every cached test whose transaction list intersects the stale set.
pub fn evict_stale(tests: &mut BTreeMap<PathBuf, CachedTest>, stale_txs: &BTreeSet<String>) {
    if stale_txs.is_empty() {
        return;
    }
    tests.retain(|_, entry| !entry.tx_ids.iter().any(|tx| stale_txs.contains(tx)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sift_common::Digest;

    fn row(artifacts: &[&str]) -> CoverageMap {
        artifacts
            .iter()
            .map(|name| (name.to_string(), json!({"0": [1]})))
            .collect()
    }

    fn entry(tx_ids: &[&str]) -> CachedTest {
        CachedTest {
            digest: Digest::from_bytes(b"entry"),
            isolated: true,
            tx_ids: tx_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn changed(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_changes_retains_everything() {
        let mut ledger = BTreeMap::new();
        ledger.insert("0x01".to_string(), row(&["Token"]));
        ledger.insert("0x02".to_string(), row(&["Vault"]));

        let inv = invalidate(&BTreeSet::new(), ledger);
        assert!(inv.stale_txs.is_empty());
        assert_eq!(inv.retained.len(), 2);
    }

    #[test]
    fn row_touching_changed_artifact_is_stale() {
        let mut ledger = BTreeMap::new();
        ledger.insert("0x01".to_string(), row(&["Token"]));
        ledger.insert("0x02".to_string(), row(&["Vault"]));

        let inv = invalidate(&changed(&["Token"]), ledger);
        assert!(inv.stale_txs.contains("0x01"));
        assert_eq!(inv.retained.len(), 1);
        assert!(inv.retained.contains_key("0x02"));
    }

    #[test]
    fn row_touching_any_changed_artifact_is_stale() {
        let mut ledger = BTreeMap::new();
        ledger.insert("0x01".to_string(), row(&["Token", "Vault"]));

        let inv = invalidate(&changed(&["Vault"]), ledger);
        assert!(inv.stale_txs.contains("0x01"));
        assert!(inv.retained.is_empty());
    }

    #[test]
    fn evicts_entries_referencing_stale_txs() {
        let mut tests = BTreeMap::new();
        tests.insert(PathBuf::from("tests/test_token.py"), entry(&["0x01"]));
        tests.insert(PathBuf::from("tests/test_vault.py"), entry(&["0x02"]));

        let stale: BTreeSet<String> = changed(&["0x01"]);
        evict_stale(&mut tests, &stale);
        assert!(!tests.contains_key(&PathBuf::from("tests/test_token.py")));
        assert!(tests.contains_key(&PathBuf::from("tests/test_vault.py")));
    }

    #[test]
    fn one_stale_tx_evicts_whole_entry() {
        let mut tests = BTreeMap::new();
        tests.insert(
            PathBuf::from("tests/test_both.py"),
            entry(&["0x01", "0x02", "0x03"]),
        );

        let stale: BTreeSet<String> = changed(&["0x02"]);
        evict_stale(&mut tests, &stale);
        assert!(tests.is_empty());
    }

    #[test]
    fn empty_stale_set_evicts_nothing() {
        let mut tests = BTreeMap::new();
        tests.insert(PathBuf::from("tests/test_token.py"), entry(&["0x01"]));
        evict_stale(&mut tests, &BTreeSet::new());
        assert_eq!(tests.len(), 1);
    }

    #[test]
    fn cascade_end_to_end() {
        // Ledger {tx1: {A}, tx2: {B}}, entries {m1: [tx1], m2: [tx2]};
        // A changes: m1 and tx1 go, m2 and tx2 stay.
        let mut ledger = BTreeMap::new();
        ledger.insert("tx1".to_string(), row(&["A"]));
        ledger.insert("tx2".to_string(), row(&["B"]));

        let mut tests = BTreeMap::new();
        tests.insert(PathBuf::from("m1"), entry(&["tx1"]));
        tests.insert(PathBuf::from("m2"), entry(&["tx2"]));

        let inv = invalidate(&changed(&["A"]), ledger);
        evict_stale(&mut tests, &inv.stale_txs);

        assert!(!tests.contains_key(&PathBuf::from("m1")));
        assert!(tests.contains_key(&PathBuf::from("m2")));
        assert!(!inv.retained.contains_key("tx1"));
        assert!(inv.retained.contains_key("tx2"));
    }
}
