//! # `openssl smime` Backend
//!
//! Signs and verifies by running the `openssl` command-line tool:
//!
//! ```text
//! openssl smime -binary -sign [-certfile WWDR] -signer CERT -inkey KEY \
//!     -in manifest.json -out signature -outform DER -passin env:PKPASS_SIGNING_PASSWORD
//! openssl smime -verify -binary -in signature -content manifest.json \
//!     -inform DER -noverify
//! ```
//!
//! The key password reaches the child through its environment, never argv,
//! so it does not show up in process listings.
//!
//! ## Exit Status Classification
//!
//! | Operation | Status | Outcome |
//! |-----------|--------|---------|
//! | sign      | 0      | signature written |
//! | sign      | 2      | [`SmimeError::BadPassword`] |
//! | sign      | other  | [`SmimeError::Status`] |
//! | verify    | 0      | `Ok(true)` |
//! | verify    | 4      | [`SmimeError::InputNotFound`] |
//! | verify    | other  | `Ok(false)` |

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use pkpass_core::{PassConfig, Password};

use crate::backend::{SignRequest, SmimeBackend, VerifyRequest};
use crate::error::SmimeError;

/// Environment variable carrying the key password to the child process.
pub const PASSWORD_ENV: &str = "PKPASS_SIGNING_PASSWORD";

/// `openssl smime -sign` status for a key that could not be unlocked.
pub const EXIT_BAD_PASSWORD: i32 = 2;

/// `openssl smime -verify` status treated as a missing input.
pub const EXIT_INPUT_NOT_FOUND: i32 = 4;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Backend running the `openssl` executable.
#[derive(Debug, Clone)]
pub struct OpensslCli {
    program: PathBuf,
    timeout: Option<Duration>,
}

/// Exit status and diagnostics of a finished tool run.
#[derive(Debug)]
struct Completed {
    status: Option<i32>,
    stderr: String,
}

impl OpensslCli {
    /// Run `program` (usually just `openssl`, resolved through `PATH`).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Executable and timeout from the process-wide configuration.
    pub fn from_config(config: &PassConfig) -> Self {
        Self::new(config.openssl.clone()).with_timeout(config.signer_timeout)
    }

    /// Kill the tool if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn run(&self, args: &[OsString], password: Option<&Password>) -> Result<Completed, SmimeError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(password) = password {
            command.env(PASSWORD_ENV, password.expose());
        } else {
            command.env(PASSWORD_ENV, "");
        }

        let mut child = command.spawn().map_err(|e| SmimeError::Spawn {
            program: self.program_name(),
            source: e,
        })?;

        // Drain stderr on a helper thread so a chatty tool cannot block on a
        // full pipe while we wait for it.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => match wait_with_deadline(&mut child, limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(
                        program = %self.program.display(),
                        timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        "signing tool timed out and was killed"
                    );
                    return Err(SmimeError::TimedOut {
                        program: self.program_name(),
                        after: limit,
                    });
                }
            },
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !stderr.trim().is_empty() {
            tracing::debug!(
                program = %self.program.display(),
                stderr = %stderr.trim(),
                "signing tool diagnostics"
            );
        }

        Ok(Completed {
            status: status.code(),
            stderr,
        })
    }
}

fn wait_with_deadline(
    child: &mut std::process::Child,
    limit: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Arguments of `openssl smime -sign`.
fn sign_args(request: &SignRequest<'_>) -> Vec<OsString> {
    let creds = request.credentials;
    let mut args: Vec<OsString> = vec!["smime".into(), "-binary".into(), "-sign".into()];
    if let Some(wwdr) = &creds.wwdr_certificate {
        args.push("-certfile".into());
        args.push(wwdr.into());
    }
    args.extend([
        "-signer".into(),
        creds.certificate.as_os_str().to_owned(),
        "-inkey".into(),
        creds.key.as_os_str().to_owned(),
        "-in".into(),
        request.manifest.as_os_str().to_owned(),
        "-out".into(),
        request.signature.as_os_str().to_owned(),
        "-outform".into(),
        "DER".into(),
        "-passin".into(),
        format!("env:{PASSWORD_ENV}").into(),
    ]);
    args
}

/// Arguments of `openssl smime -verify`; `-noverify` skips chain validation.
fn verify_args(request: &VerifyRequest<'_>) -> Vec<OsString> {
    vec![
        "smime".into(),
        "-verify".into(),
        "-binary".into(),
        "-in".into(),
        request.signature.as_os_str().to_owned(),
        "-content".into(),
        request.manifest.as_os_str().to_owned(),
        "-inform".into(),
        "DER".into(),
        "-noverify".into(),
    ]
}

impl SmimeBackend for OpensslCli {
    fn name(&self) -> &str {
        "openssl"
    }

    fn sign_detached(&self, request: &SignRequest<'_>) -> Result<(), SmimeError> {
        let done = self.run(&sign_args(request), request.credentials.password.as_ref())?;
        match done.status {
            Some(0) => Ok(()),
            Some(EXIT_BAD_PASSWORD) => Err(SmimeError::BadPassword),
            status => Err(SmimeError::Status {
                program: self.program_name(),
                status,
                stderr: done.stderr,
            }),
        }
    }

    fn verify_detached(&self, request: &VerifyRequest<'_>) -> Result<bool, SmimeError> {
        let done = self.run(&verify_args(request), None)?;
        match done.status {
            Some(0) => Ok(true),
            Some(EXIT_INPUT_NOT_FOUND) => Err(SmimeError::InputNotFound),
            status => {
                tracing::debug!(?status, "signature did not verify");
                Ok(false)
            }
        }
    }
}
