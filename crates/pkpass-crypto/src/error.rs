//! # Backend Error Types
//!
//! Outcomes a signing backend reports besides success. The two classified
//! failures (`BadPassword`, `InputNotFound`) are distinguished because callers
//! react to them differently; everything else keeps the raw status for
//! diagnosis.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a [`SmimeBackend`](crate::SmimeBackend).
#[derive(Error, Debug)]
pub enum SmimeError {
    /// The private key could not be unlocked with the given password.
    #[error("signer rejected the key password")]
    BadPassword,

    /// An input file disappeared before the backend could read it.
    #[error("signer input not found")]
    InputNotFound,

    /// The tool exited with a status that has no specific meaning.
    #[error("{program} exited with status {status:?}")]
    Status {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The tool ran longer than the configured limit and was killed.
    #[error("{program} timed out after {after:?}")]
    TimedOut { program: String, after: Duration },

    /// The tool could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// I/O error while preparing or collecting backend files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
