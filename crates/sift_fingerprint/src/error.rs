//! Error types for fingerprinting operations.

use std::path::PathBuf;

/// Errors that can occur while fingerprinting a test module.
///
/// None of these are fail-safe at this layer: they propagate to the caller,
/// which treats the affected module as always-changed rather than silently
/// caching a digest that may be wrong.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// A source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A module could not be structurally analyzed.
    #[error("parse error in {path} on line {line}: {reason}")]
    Parse {
        /// The module that failed to lex.
        path: PathBuf,
        /// One-based line number of the failure.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// An import could not be mapped to a file location.
    #[error("cannot resolve import `{name}` in {path}")]
    Resolution {
        /// The dotted module name that failed to resolve.
        name: String,
        /// The module containing the import.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = FingerprintError::Io {
            path: PathBuf::from("tests/test_token.py"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to read"));
        assert!(msg.contains("test_token.py"));
    }

    #[test]
    fn parse_error_display() {
        let err = FingerprintError::Parse {
            path: PathBuf::from("tests/broken.py"),
            line: 7,
            reason: "unterminated string literal".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("unterminated string literal"));
    }

    #[test]
    fn resolution_error_display() {
        let err = FingerprintError::Resolution {
            name: ".helpers".to_string(),
            path: PathBuf::from("tests/test_a.py"),
        };
        let msg = err.to_string();
        assert!(msg.contains("`.helpers`"));
        assert!(msg.contains("test_a.py"));
    }
}
