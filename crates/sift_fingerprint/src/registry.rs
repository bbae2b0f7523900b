//! Shared-setup module registry and cache-key combination.
//!
//! Shared-setup modules (directory-scoped fixture files) influence every test
//! module under their directory. The registry records them once per session,
//! before any dependent is hashed; the combiner folds the ones in scope into
//! a module's final cache key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sift_common::Digest;

use crate::imports::normalize;

/// Registry of shared-setup modules, keyed by normalized path.
///
/// Backed by a `BTreeMap` so iteration follows a fixed lexicographic order:
/// the combined key for a module depends only on which setups are registered,
/// never on the order they were registered in.
#[derive(Debug, Clone, Default)]
pub struct SetupRegistry {
    setups: BTreeMap<PathBuf, Digest>,
}

impl SetupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared-setup module with its own structural digest.
    pub fn register(&mut self, path: impl Into<PathBuf>, digest: Digest) {
        self.setups.insert(normalize(&path.into()), digest);
    }

    /// Returns the registered digest for a setup module, if any.
    pub fn digest(&self, path: &Path) -> Option<Digest> {
        self.setups.get(&normalize(path)).copied()
    }

    /// Number of registered setup modules.
    pub fn len(&self) -> usize {
        self.setups.len()
    }

    /// Returns `true` if no setup modules are registered.
    pub fn is_empty(&self) -> bool {
        self.setups.is_empty()
    }

    /// Setup modules whose directory scope covers `module_path`, in
    /// lexicographic path order.
    fn in_scope<'a>(&'a self, module_path: &'a Path) -> impl Iterator<Item = &'a Path> {
        let module = normalize(module_path);
        self.setups.keys().filter_map(move |setup| {
            let scope = setup.parent()?;
            module.starts_with(scope).then_some(setup.as_path())
        })
    }
}

/// Combines a module's own fingerprint with the shared-setup modules in
/// scope, producing the cache key that gets stored.
///
/// The module digest's hex form seeds an accumulator; each in-scope setup
/// path is appended in lexicographic order; the result is re-hashed. The
/// accumulator is always re-hashed, so a combined key is never equal to the
/// raw module digest.
pub fn combine(module_digest: Digest, module_path: &Path, registry: &SetupRegistry) -> Digest {
    let mut acc = module_digest.to_hex();
    for setup in registry.in_scope(module_path) {
        acc.push_str(&setup.to_string_lossy());
    }
    Digest::from_bytes(acc.as_bytes())
}
