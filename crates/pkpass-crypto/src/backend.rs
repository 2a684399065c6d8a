//! # Signing Backend Abstraction
//!
//! The seam between the pass pipeline and whatever actually produces CMS
//! signatures. The pipeline only needs two capabilities:
//!
//! - sign the manifest file, writing a detached DER signature next to it;
//! - verify a detached signature against the manifest, without validating
//!   the certificate chain.
//!
//! Backends work on paths rather than buffers because the production backend
//! is an external process that reads and writes files itself.

use std::path::{Path, PathBuf};

use pkpass_core::{PassConfig, Password};

use crate::error::SmimeError;

/// Certificate, key and password used to sign a manifest.
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    /// PEM signing certificate.
    pub certificate: PathBuf,
    /// PEM private key matching `certificate`.
    pub key: PathBuf,
    /// Intermediate certificate embedded in the signature, if any.
    pub wwdr_certificate: Option<PathBuf>,
    /// Password of `key`.
    pub password: Option<Password>,
}

impl SigningCredentials {
    /// The process-wide defaults.
    pub fn from_config(config: &PassConfig) -> Self {
        Self {
            certificate: config.certificate.clone(),
            key: config.key.clone(),
            wwdr_certificate: config.wwdr_certificate.clone(),
            password: config.password.clone(),
        }
    }

    /// Replace the password.
    pub fn with_password(mut self, password: Option<Password>) -> Self {
        self.password = password;
        self
    }
}

/// Inputs of a detached signing operation.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    /// Document to sign.
    pub manifest: &'a Path,
    /// Where the DER signature is written.
    pub signature: &'a Path,
    pub credentials: &'a SigningCredentials,
}

/// Inputs of a detached verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifyRequest<'a> {
    /// DER signature to check.
    pub signature: &'a Path,
    /// Document the signature claims to cover.
    pub manifest: &'a Path,
}

/// A provider of detached S/MIME signatures.
///
/// Implementations MUST:
/// - Write nothing but the signature file.
/// - Report a rejected key password as [`SmimeError::BadPassword`].
/// - Skip certificate chain validation in `verify_detached`; only message
///   integrity and signature correctness are checked.
///
/// The trait is object-safe for use as `&dyn SmimeBackend`.
pub trait SmimeBackend: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Sign `request.manifest`, writing the DER signature to `request.signature`.
    fn sign_detached(&self, request: &SignRequest<'_>) -> Result<(), SmimeError>;

    /// Check a signature. `Ok(false)` means the signature does not verify.
    fn verify_detached(&self, request: &VerifyRequest<'_>) -> Result<bool, SmimeError>;
}
