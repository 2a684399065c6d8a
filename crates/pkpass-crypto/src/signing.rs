//! # Manifest Signing and Verification
//!
//! Pre-flight checks around a [`SmimeBackend`] plus the mapping of backend
//! outcomes onto the [`PassError`] catalogue.

use std::path::Path;

use pkpass_core::{PassError, PassResult};

use crate::backend::{SignRequest, SigningCredentials, SmimeBackend, VerifyRequest};
use crate::error::SmimeError;

/// Sign `manifest`, writing a detached DER signature to `signature`.
///
/// # Errors
///
/// - [`PassError::CertificateNotFound`] if the certificate path is empty or
///   does not exist.
/// - [`PassError::ManifestNotFound`] if `manifest` does not exist.
/// - [`PassError::IncorrectPassword`] if the backend rejects the password.
/// - [`PassError::ExternalTool`] for any other backend failure.
///
/// No signature file is left behind when signing fails.
pub fn sign_manifest(
    backend: &dyn SmimeBackend,
    manifest: &Path,
    signature: &Path,
    credentials: &SigningCredentials,
) -> PassResult<()> {
    if credentials.certificate.as_os_str().is_empty() {
        return Err(PassError::CertificateNotFound {
            context: "no signing certificate configured".to_string(),
        });
    }
    if !credentials.certificate.exists() {
        return Err(PassError::CertificateNotFound {
            context: format!("{} does not exist", credentials.certificate.display()),
        });
    }
    if !manifest.exists() {
        return Err(PassError::ManifestNotFound {
            context: format!("{} does not exist; build the manifest first", manifest.display()),
        });
    }
    if credentials.password.as_ref().map_or(true, |p| p.is_empty()) {
        tracing::warn!(
            certificate = %credentials.certificate.display(),
            "signing without a key password"
        );
    }

    let request = SignRequest {
        manifest,
        signature,
        credentials,
    };
    tracing::debug!(
        backend = backend.name(),
        manifest = %manifest.display(),
        signature = %signature.display(),
        "signing manifest"
    );

    match backend.sign_detached(&request) {
        Ok(()) => Ok(()),
        Err(err) => {
            discard_partial(signature);
            Err(classify_sign_error(err))
        }
    }
}

/// Check a detached signature against `manifest` with chain validation off.
///
/// Returns `Ok(false)` when the signature does not verify.
///
/// # Errors
///
/// - [`PassError::SignatureNotFound`] if `signature` does not exist or the
///   backend reports a missing input.
/// - [`PassError::ExternalTool`] if the backend could not run.
pub fn verify_signature(
    backend: &dyn SmimeBackend,
    signature: &Path,
    manifest: &Path,
) -> PassResult<bool> {
    if !signature.exists() {
        return Err(PassError::SignatureNotFound {
            context: format!("{} does not exist", signature.display()),
        });
    }

    let request = VerifyRequest {
        signature,
        manifest,
    };
    match backend.verify_detached(&request) {
        Ok(valid) => {
            tracing::debug!(
                backend = backend.name(),
                signature = %signature.display(),
                valid,
                "verified signature"
            );
            Ok(valid)
        }
        Err(SmimeError::InputNotFound) => Err(PassError::SignatureNotFound {
            context: format!("verifier could not read {}", signature.display()),
        }),
        Err(err) => Err(external_tool(err, "verifying signature")),
    }
}

fn classify_sign_error(err: SmimeError) -> PassError {
    match err {
        SmimeError::BadPassword => PassError::IncorrectPassword {
            context: "signing manifest".to_string(),
        },
        other => external_tool(other, "signing manifest"),
    }
}

fn external_tool(err: SmimeError, operation: &str) -> PassError {
    match err {
        SmimeError::Status { status, stderr, .. } => PassError::ExternalTool {
            status,
            stderr,
            context: operation.to_string(),
        },
        other => PassError::ExternalTool {
            status: None,
            stderr: String::new(),
            context: format!("{operation}: {other}"),
        },
    }
}

fn discard_partial(signature: &Path) {
    match std::fs::remove_file(signature) {
        Ok(()) => tracing::debug!(signature = %signature.display(), "removed partial signature"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            signature = %signature.display(),
            error = %e,
            "could not remove partial signature"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSmimeBackend;
    use pkpass_core::{ErrorKind, Password};
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
        credentials: SigningCredentials,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let certificate = dir.path().join("certificate.pem");
            let key = dir.path().join("key.pem");
            std::fs::write(&certificate, "cert").unwrap();
            std::fs::write(&key, "key").unwrap();
            std::fs::write(dir.path().join("manifest.json"), r#"{"logo.png":"00"}"#).unwrap();
            Self {
                credentials: SigningCredentials {
                    certificate,
                    key,
                    wwdr_certificate: None,
                    password: Some(Password::new("1234")),
                },
                dir,
            }
        }

        fn manifest(&self) -> PathBuf {
            self.dir.path().join("manifest.json")
        }

        fn signature(&self) -> PathBuf {
            self.dir.path().join("signature")
        }
    }

    #[test]
    fn sign_then_verify() {
        let fx = Fixture::new();
        let backend = MockSmimeBackend::new().with_password("1234");
        sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials).unwrap();
        assert!(fx.signature().exists());
        assert!(verify_signature(&backend, &fx.signature(), &fx.manifest()).unwrap());
    }

    #[test]
    fn empty_certificate_reference() {
        let mut fx = Fixture::new();
        fx.credentials.certificate = PathBuf::new();
        let backend = MockSmimeBackend::new();
        let err = sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CertificateNotFound);
        assert_eq!(backend.sign_calls(), 0);
    }

    #[test]
    fn missing_certificate_file() {
        let mut fx = Fixture::new();
        fx.credentials.certificate = fx.dir.path().join("absent.pem");
        let backend = MockSmimeBackend::new();
        let err = sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CertificateNotFound);
    }

    #[test]
    fn missing_manifest() {
        let fx = Fixture::new();
        std::fs::remove_file(fx.manifest()).unwrap();
        let backend = MockSmimeBackend::new();
        let err = sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ManifestNotFound);
        assert!(!fx.signature().exists());
        assert_eq!(backend.sign_calls(), 0);
    }

    #[test]
    fn wrong_password_leaves_no_signature() {
        let fx = Fixture::new();
        let backend = MockSmimeBackend::new().with_password("12345");
        let err = sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectPassword);
        assert!(!fx.signature().exists());
    }

    #[test]
    fn missing_password_still_signs() {
        let mut fx = Fixture::new();
        fx.credentials.password = None;
        let backend = MockSmimeBackend::new();
        sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials).unwrap();
        assert!(fx.signature().exists());
    }

    #[test]
    fn unclassified_status_carries_code_and_stderr() {
        let fx = Fixture::new();
        std::fs::write(fx.signature(), b"stale").unwrap();
        let backend = MockSmimeBackend::new().failing_with(3);
        let err = sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials)
            .unwrap_err();
        match err {
            PassError::ExternalTool { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert!(!stderr.is_empty());
            }
            other => panic!("expected ExternalTool, got {other:?}"),
        }
        assert!(!fx.signature().exists());
    }

    #[test]
    fn verify_missing_signature() {
        let fx = Fixture::new();
        let backend = MockSmimeBackend::new();
        let err = verify_signature(&backend, &fx.signature(), &fx.manifest()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureNotFound);
        assert_eq!(backend.verify_calls(), 0);
    }

    #[test]
    fn verify_detects_modified_manifest() {
        let fx = Fixture::new();
        let backend = MockSmimeBackend::new();
        sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials).unwrap();
        std::fs::write(fx.manifest(), r#"{"logo.png":"01"}"#).unwrap();
        assert!(!verify_signature(&backend, &fx.signature(), &fx.manifest()).unwrap());
    }

    #[test]
    fn verify_with_missing_manifest_is_signature_not_found() {
        let fx = Fixture::new();
        let backend = MockSmimeBackend::new();
        sign_manifest(&backend, &fx.manifest(), &fx.signature(), &fx.credentials).unwrap();
        std::fs::remove_file(fx.manifest()).unwrap();
        let err = verify_signature(&backend, &fx.signature(), &fx.manifest()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureNotFound);
    }
}
