//! # Mock Signing Backend
//!
//! In-process stand-in for `openssl smime`, for tests that exercise the pass
//! pipeline without an external tool or real certificates.
//!
//! A mock signature is `MAGIC || nonce || mac || certificate path`, where
//! `mac = SHA-256(nonce || certificate path || manifest bytes)`. The random
//! nonce makes two signatures of the same manifest differ while both verify,
//! like real CMS signatures with a signing-time attribute. Any change to the
//! manifest breaks the MAC.
//!
//! **This provides no security.** It only mirrors the observable behaviour of
//! the production backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use sha2::{Digest, Sha256};

use crate::backend::{SignRequest, SmimeBackend, VerifyRequest};
use crate::error::SmimeError;

const MAGIC: &[u8; 8] = b"PKMOCK1\0";
const NONCE_LEN: usize = 16;
const MAC_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + NONCE_LEN + MAC_LEN;

/// Deterministic, in-process [`SmimeBackend`].
#[derive(Debug, Default)]
pub struct MockSmimeBackend {
    expected_password: Option<String>,
    forced_status: Option<i32>,
    sign_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl MockSmimeBackend {
    /// Accepts any password and never fails on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject signing unless the key password equals `password`.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.expected_password = Some(password.into());
        self
    }

    /// Make every signing attempt fail with exit status `status` after
    /// writing a truncated signature.
    pub fn failing_with(mut self, status: i32) -> Self {
        self.forced_status = Some(status);
        self
    }

    /// Number of `sign_detached` calls so far.
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Number of `verify_detached` calls so far.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

fn mac(nonce: &[u8], certificate: &[u8], manifest: &[u8]) -> [u8; MAC_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(certificate);
    hasher.update(manifest);
    hasher.finalize().into()
}

impl SmimeBackend for MockSmimeBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn sign_detached(&self, request: &SignRequest<'_>) -> Result<(), SmimeError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(status) = self.forced_status {
            std::fs::write(request.signature, MAGIC)?;
            return Err(SmimeError::Status {
                program: "mock".to_string(),
                status: Some(status),
                stderr: format!("forced failure with status {status}"),
            });
        }

        if let Some(expected) = &self.expected_password {
            let given = request
                .credentials
                .password
                .as_ref()
                .map(|p| p.expose())
                .unwrap_or_default();
            if given != expected.as_str() {
                return Err(SmimeError::BadPassword);
            }
        }

        let manifest = std::fs::read(request.manifest).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SmimeError::InputNotFound,
            _ => SmimeError::Io(e),
        })?;
        let certificate = request.credentials.certificate.to_string_lossy();
        let nonce = uuid::Uuid::new_v4();

        let mut out = Vec::with_capacity(HEADER_LEN + certificate.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(nonce.as_bytes());
        out.extend_from_slice(&mac(nonce.as_bytes(), certificate.as_bytes(), &manifest));
        out.extend_from_slice(certificate.as_bytes());
        std::fs::write(request.signature, out)?;
        Ok(())
    }

    fn verify_detached(&self, request: &VerifyRequest<'_>) -> Result<bool, SmimeError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        let read = |path: &std::path::Path| {
            std::fs::read(path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SmimeError::InputNotFound,
                _ => SmimeError::Io(e),
            })
        };
        let signature = read(request.signature)?;
        let manifest = read(request.manifest)?;

        if signature.len() < HEADER_LEN || &signature[..MAGIC.len()] != MAGIC {
            return Ok(false);
        }
        let nonce = &signature[MAGIC.len()..MAGIC.len() + NONCE_LEN];
        let stored = &signature[MAGIC.len() + NONCE_LEN..HEADER_LEN];
        let certificate = &signature[HEADER_LEN..];
        Ok(mac(nonce, certificate, &manifest).as_slice() == stored)
    }
}
