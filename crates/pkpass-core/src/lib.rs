//! # pkpass-core: Foundational Types for Wallet Pass Packaging
//!
//! Every other crate in the workspace depends on `pkpass-core`; it depends on
//! nothing internal. It defines:
//!
//! - **Error catalogue** ([`error`]): one [`PassError`] type whose variants map
//!   onto a stable [`ErrorKind`] with a mnemonic, base message and catalog
//!   number, so callers can branch on the failure without string matching.
//!
//! - **Digest algorithms** ([`digest`]): the pinned content digest used for
//!   manifest entries. SHA-1 is what the wallet platform expects.
//!
//! - **Configuration** ([`config`]): process-wide signing defaults
//!   (certificate, key, password, temp-file retention) with a load-once
//!   lifecycle, passed by reference into each pass.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pkpass-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod digest;
pub mod error;

/// Archive entry name of the manifest document.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Archive entry name of the detached signature.
///
/// The wallet platform refuses to load a pass whose signature entry has any
/// other name.
pub const SIGNATURE_NAME: &str = "signature";

// Re-export primary types for ergonomic imports.
pub use config::{PassConfig, Password};
pub use digest::DigestAlgorithm;
pub use error::{ErrorKind, PassError, PassResult};
