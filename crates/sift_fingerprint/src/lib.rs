//! Structural fingerprinting of test modules.
//!
//! This crate computes deterministic content digests for test modules:
//! sources are flattened to a structural token stream (comments, whitespace,
//! and formatting stripped), direct local imports are folded in one level
//! deep, and shared-setup modules in scope contribute to the final cache key.

#![warn(missing_docs)]

pub mod error;
pub mod fingerprint;
pub mod imports;
pub mod lexer;
pub mod registry;

pub use error::FingerprintError;
pub use fingerprint::Fingerprinter;
pub use imports::{scan_imports, Import, ProjectLayout, ProjectResolver};
pub use registry::{combine, SetupRegistry};
