//! # Error Catalogue
//!
//! Structured error types for the whole pass pipeline, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Every [`PassError`] carries the operation that was being attempted as
//! free-form context, and maps to an [`ErrorKind`] with a machine-readable
//! mnemonic, a human-readable base message, and a catalog number. Callers
//! branch on [`PassError::kind`] instead of matching message strings.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// First catalog number of the pass error range.
pub const BASE_CATALOG_NUMBER: u16 = 100;

/// Errors raised by any step of the pass pipeline.
#[derive(Error, Debug)]
pub enum PassError {
    /// The signer rejected the password protecting the private key.
    #[error("incorrect password: {context}")]
    IncorrectPassword { context: String },

    /// No usable signing certificate at the point of use.
    #[error("certificate not found: {context}")]
    CertificateNotFound { context: String },

    /// The manifest to sign does not exist.
    #[error("manifest not found: {context}")]
    ManifestNotFound { context: String },

    /// The signature is missing, or no valid signature could be confirmed.
    #[error("signature not found: {context}")]
    SignatureNotFound { context: String },

    /// A file the caller asked to track does not exist.
    #[error("required file not found: {}: {context}", .path.display())]
    FileNotFound { path: PathBuf, context: String },

    /// The external signing tool failed with a status not otherwise classified,
    /// could not be launched, or was killed after timing out.
    #[error("external signer failed ({}): {context}", describe_status(.status))]
    ExternalTool {
        /// Raw exit status, `None` when the process never produced one.
        status: Option<i32>,
        /// Captured diagnostic output of the tool (may be empty).
        stderr: String,
        context: String,
    },

    /// A path that must be fresh already exists.
    #[error("path already exists: {}: {context}", .path.display())]
    PathAlreadyExists { path: PathBuf, context: String },

    /// A destination is taken, reserved, or otherwise unusable.
    #[error("path not available: {}: {context}", .path.display())]
    PathNotAvailable { path: PathBuf, context: String },

    /// A pipeline step was invoked in a lifecycle state that does not allow it.
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        /// The current lifecycle state name.
        state: String,
        /// The rejected operation.
        operation: String,
    },

    /// The archive writer failed.
    #[error("archive error: {context}")]
    Archive { context: String },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pass operations.
pub type PassResult<T> = Result<T, PassError>;

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}

impl PassError {
    /// The catalogue entry this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IncorrectPassword { .. } => ErrorKind::IncorrectPassword,
            Self::CertificateNotFound { .. } => ErrorKind::CertificateNotFound,
            Self::ManifestNotFound { .. } => ErrorKind::ManifestNotFound,
            Self::SignatureNotFound { .. } => ErrorKind::SignatureNotFound,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::ExternalTool { .. } => ErrorKind::ExternalTool,
            Self::PathAlreadyExists { .. } => ErrorKind::PathAlreadyExists,
            Self::PathNotAvailable { .. } => ErrorKind::PathNotAvailable,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Archive { .. } => ErrorKind::Archive,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Serialization,
        }
    }

    /// Caller-supplied description of the operation that failed, if any.
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::IncorrectPassword { context }
            | Self::CertificateNotFound { context }
            | Self::ManifestNotFound { context }
            | Self::SignatureNotFound { context }
            | Self::FileNotFound { context, .. }
            | Self::ExternalTool { context, .. }
            | Self::PathAlreadyExists { context, .. }
            | Self::PathNotAvailable { context, .. }
            | Self::Archive { context } => Some(context.as_str()),
            Self::InvalidState { .. } | Self::Config(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }
}

/// Stable classification of a [`PassError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IncorrectPassword,
    CertificateNotFound,
    ManifestNotFound,
    SignatureNotFound,
    FileNotFound,
    ExternalTool,
    PathAlreadyExists,
    PathNotAvailable,
    InvalidState,
    Archive,
    Config,
    Io,
    Serialization,
}

impl ErrorKind {
    /// Machine-readable mnemonic, stable across releases.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::IncorrectPassword => "PB_EXP_PASSWORD",
            Self::CertificateNotFound => "PB_CERT_NOTFOUND",
            Self::ManifestNotFound => "PB_MANIFEST_NOTFOUND",
            Self::SignatureNotFound => "PB_SIG_NOTFOUND",
            Self::FileNotFound => "PB_FILE_NOT_FOUND",
            Self::ExternalTool => "PB_SIGNER_FAILED",
            Self::PathAlreadyExists => "PB_PATH_ALREADY_EXISTS",
            Self::PathNotAvailable => "PB_PATH_NOT_AVAILABLE",
            Self::InvalidState => "PB_INVALID_STATE",
            Self::Archive => "PB_ARCHIVE",
            Self::Config => "PB_CONFIG",
            Self::Io => "PB_IO",
            Self::Serialization => "PB_SERIALIZATION",
        }
    }

    /// Human-readable base message.
    pub fn base_message(self) -> &'static str {
        match self {
            Self::IncorrectPassword => "Incorrect password",
            Self::CertificateNotFound => "Certificate not found",
            Self::ManifestNotFound => "Manifest not found",
            Self::SignatureNotFound => "Signature not found",
            Self::FileNotFound => "Required file not found",
            Self::ExternalTool => "External signing tool failed",
            Self::PathAlreadyExists => "Path is not available as it already exists",
            Self::PathNotAvailable => "Path is not available",
            Self::InvalidState => "Operation not allowed in current state",
            Self::Archive => "Archive could not be written",
            Self::Config => "Invalid configuration",
            Self::Io => "I/O failure",
            Self::Serialization => "Serialization failure",
        }
    }

    /// Number of this entry in the error catalogue.
    pub fn catalog_number(self) -> u16 {
        BASE_CATALOG_NUMBER
            + match self {
                Self::IncorrectPassword => 1,
                Self::CertificateNotFound => 2,
                Self::ManifestNotFound => 3,
                Self::SignatureNotFound => 4,
                Self::FileNotFound => 5,
                Self::ExternalTool => 6,
                Self::PathAlreadyExists => 10,
                Self::PathNotAvailable => 11,
                Self::InvalidState => 12,
                Self::Archive => 13,
                Self::Config => 14,
                Self::Io => 20,
                Self::Serialization => 21,
            }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
