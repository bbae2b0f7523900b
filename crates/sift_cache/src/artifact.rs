//! Compiled-artifact change detection.
//!
//! The build collaborator exposes the current compilation's artifacts; this
//! module diffs their payload digests against the previous run's recorded
//! digests to produce the set of changed artifact names that drives
//! invalidation.

use std::collections::{BTreeMap, BTreeSet};

use sift_common::Digest;

/// One compiled artifact as exposed by the build collaborator.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// Compiled byte payload; empty for interfaces and abstract artifacts.
    pub payload: Vec<u8>,
    /// Digest of the payload.
    pub digest: Digest,
}

impl BuildArtifact {
    /// Creates an artifact from its payload, computing the digest.
    pub fn from_payload(payload: Vec<u8>) -> Self {
        let digest = Digest::from_bytes(&payload);
        Self { payload, digest }
    }
}

/// Read-only source of the current compilation's artifacts.
pub trait ArtifactProvider {
    /// The current artifacts, keyed by name.
    fn artifacts(&self) -> BTreeMap<String, BuildArtifact>;
}

impl ArtifactProvider for BTreeMap<String, BuildArtifact> {
    fn artifacts(&self) -> BTreeMap<String, BuildArtifact> {
        self.clone()
    }
}

/// Extracts the digest table for the current artifacts.
///
/// Artifacts with an empty payload are excluded: they cannot be executed,
/// so nothing can reference them and they can never invalidate anything.
pub fn current_digests(artifacts: &BTreeMap<String, BuildArtifact>) -> BTreeMap<String, Digest> {
    artifacts
        .iter()
        .filter(|(_, a)| !a.payload.is_empty())
        .map(|(name, a)| (name.clone(), a.digest))
        .collect()
}

/// Diffs the previous run's artifact digests against the current ones.
///
/// An artifact is changed if it is present now (with a non-empty payload,
/// enforced by [`current_digests`]) and is either new or carries a different
/// digest. Artifacts that existed before but are gone now are not reported;
/// no current transaction can reference them.
pub fn detect_changes(
    previous: &BTreeMap<String, Digest>,
    current: &BTreeMap<String, Digest>,
) -> BTreeSet<String> {
    current
        .iter()
        .filter(|(name, digest)| previous.get(*name) != Some(*digest))
        .map(|(name, _)| name.clone())
        .collect()
}
