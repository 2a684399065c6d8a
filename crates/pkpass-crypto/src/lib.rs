//! # pkpass-crypto: Manifest Signing and Verification
//!
//! Produces and checks the detached, DER-encoded CMS signature that
//! authenticates a pass manifest. The cryptography itself is delegated to a
//! [`SmimeBackend`]:
//!
//! - [`OpensslCli`] runs `openssl smime`, the production backend.
//! - [`MockSmimeBackend`] (feature `mock`) signs in-process for tests.
//!
//! [`sign_manifest`] and [`verify_signature`] wrap any backend with the
//! pre-flight checks (certificate and manifest present, signature present)
//! and translate backend outcomes into the [`PassError`](pkpass_core::PassError)
//! catalogue. Checks run before the backend is invoked, so a missing input
//! never costs an external process launch.
//!
//! ## Crate Policy
//!
//! - Depends only on `pkpass-core` internally.
//! - Passwords never appear in process arguments or logs.

pub mod backend;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openssl;
pub mod signing;

pub use backend::{SignRequest, SigningCredentials, SmimeBackend, VerifyRequest};
pub use error::SmimeError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockSmimeBackend;
pub use openssl::OpensslCli;
pub use signing::{sign_manifest, verify_signature};
