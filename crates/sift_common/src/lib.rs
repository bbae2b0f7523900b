//! Shared foundational types for the sift incremental test cache.
//!
//! This crate provides the content digest type used by every other crate in
//! the workspace to fingerprint test modules, shared-setup modules, and
//! compiled artifacts.

#![warn(missing_docs)]

pub mod digest;

pub use digest::{Digest, ParseDigestError};
