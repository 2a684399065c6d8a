//! # pkpass-pack: Pass Assembly
//!
//! Turns a set of files into a signed `.pkpass` archive:
//!
//! - **Workspace** ([`workspace`]): a private `tmp_<suffix>` directory per
//!   pass, created atomically and removed only on request.
//! - **Tracked files** ([`files`]): the files to ship, keyed by archive
//!   entry name.
//! - **Manifest** ([`manifest`]): `manifest.json`, the digest of every
//!   tracked file.
//! - **Archive** ([`archive`]): the deflate zip container, written to a
//!   temporary file and renamed into place.
//! - **Pass** ([`pass`]): the orchestrator running build, sign, package and
//!   cleanup through an injected [`SmimeBackend`](pkpass_crypto::SmimeBackend).

pub mod archive;
pub mod files;
pub mod manifest;
pub mod pass;
pub mod workspace;

pub use files::FileSet;
pub use manifest::Manifest;
pub use pass::{Pass, PassOptions, PassState};
pub use workspace::Workspace;
