//! Content fingerprinting with one-level transitive dependency inclusion.

use std::path::Path;

use sift_common::Digest;

use crate::error::FingerprintError;
use crate::imports::{normalize, scan_imports, ProjectResolver};
use crate::lexer::{lex, structural_dump, Token};

/// Computes structural content digests for test modules.
///
/// A module's fingerprint covers its own structural dump plus the dumps of
/// every module it directly imports from inside the project, concatenated in
/// the order the imports appear. Included dependencies' own imports are not
/// followed: inclusion is exactly one level deep. Comments, whitespace, and
/// formatting never affect the result.
pub struct Fingerprinter<'a, R: ProjectResolver> {
    resolver: &'a R,
}

impl<'a, R: ProjectResolver> Fingerprinter<'a, R> {
    /// Creates a fingerprinter using the given project resolver.
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Fingerprints the module at `module_path`.
    ///
    /// Fails with [`FingerprintError::Parse`] if the module or one of its
    /// included dependencies cannot be structurally analyzed, and with
    /// [`FingerprintError::Resolution`] if an import cannot be mapped to a
    /// file. Errors propagate; they are never folded into a digest.
    pub fn fingerprint(&self, module_path: &Path) -> Result<Digest, FingerprintError> {
        let entry_tokens = lex_file(module_path)?;
        let mut dump = structural_dump(&entry_tokens);

        let root = normalize(self.resolver.project_root());
        for import in scan_imports(&entry_tokens) {
            let origin = match self.resolver.resolve_import(&import.module, module_path)? {
                Some(origin) => origin,
                None => continue,
            };
            if !normalize(&origin).starts_with(&root) {
                continue;
            }
            let dep_tokens = lex_file(&origin)?;
            dump.push('\n');
            dump.push_str(&structural_dump(&dep_tokens));
        }

        Ok(Digest::from_bytes(dump.as_bytes()))
    }
}

fn lex_file(path: &Path) -> Result<Vec<Token>, FingerprintError> {
    let source = std::fs::read_to_string(path).map_err(|e| FingerprintError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    lex(&source).map_err(|e| FingerprintError::Parse {
        path: path.to_path_buf(),
        line: e.line,
        reason: e.reason,
    })
}
