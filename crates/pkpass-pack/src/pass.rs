//! # Pass Orchestrator
//!
//! A [`Pass`] owns one private workspace and drives the fixed pipeline:
//!
//! ```text
//! Created ─build_manifest─▶ ManifestBuilt ─sign─▶ Signed ─package─▶ Packaged ─cleanup─▶ CleanedUp
//!    │                           │                  │                  │
//!    └───────────────────────────┴──── error ───────┴──────────────────┴──▶ Failed
//! ```
//!
//! [`Pass::generate`] runs every step in order and stops at the first error,
//! leaving the workspace on disk for inspection. Cleanup happens only after
//! a fully successful run or when the caller asks for it.

use std::fmt;
use std::path::{Path, PathBuf};

use pkpass_core::{PassConfig, PassError, PassResult, Password, MANIFEST_NAME, SIGNATURE_NAME};
use pkpass_crypto::{sign_manifest, verify_signature, SigningCredentials, SmimeBackend};

use crate::archive::write_archive;
use crate::files::FileSet;
use crate::manifest::Manifest;
use crate::workspace::Workspace;

/// Lifecycle state of a [`Pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassState {
    Created,
    ManifestBuilt,
    Signed,
    Packaged,
    CleanedUp,
    /// A pipeline step failed; the workspace is left as it was.
    Failed,
}

impl PassState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::ManifestBuilt => "ManifestBuilt",
            Self::Signed => "Signed",
            Self::Packaged => "Packaged",
            Self::CleanedUp => "CleanedUp",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-pass switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Replace an existing file at the output path.
    pub allow_overwrite: bool,
    /// Run [`Pass::generate`] as part of construction.
    pub auto_generate: bool,
}

/// One pass being assembled.
pub struct Pass<'a> {
    output: PathBuf,
    files: FileSet,
    workspace: Workspace,
    password: Option<Password>,
    options: PassOptions,
    state: PassState,
    config: &'a PassConfig,
    backend: &'a dyn SmimeBackend,
}

impl fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("output", &self.output)
            .field("files", &self.files)
            .field("workspace", &self.workspace)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl<'a> Pass<'a> {
    /// Create a pass writing to `output` and track `files`.
    ///
    /// The workspace is created under `config.workspace_root` first. An
    /// existing `output` is rejected unless `options.allow_overwrite` is
    /// set. With `options.auto_generate` the whole pipeline runs before
    /// this returns.
    ///
    /// # Errors
    ///
    /// - [`PassError::PathAlreadyExists`] on a workspace name collision.
    /// - [`PassError::PathNotAvailable`] if `output` exists.
    /// - Any error of [`Pass::add_file`] or [`Pass::generate`].
    pub fn new<I, P>(
        output: impl Into<PathBuf>,
        files: I,
        options: PassOptions,
        config: &'a PassConfig,
        backend: &'a dyn SmimeBackend,
    ) -> PassResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let output = output.into();
        let workspace = Workspace::create(&config.workspace_root, config.keep_temp_files)?;

        if output.exists() && !options.allow_overwrite {
            // Nothing has been written yet, so the empty workspace goes too.
            discard_workspace(&workspace);
            return Err(PassError::PathNotAvailable {
                path: output,
                context: "output exists and overwriting is not allowed".to_string(),
            });
        }

        let mut pass = Self {
            output,
            files: FileSet::new(),
            workspace,
            password: config.password.clone(),
            options,
            state: PassState::Created,
            config,
            backend,
        };
        for file in files {
            if let Err(err) = pass.add_file(file.as_ref()) {
                discard_workspace(&pass.workspace);
                return Err(err);
            }
        }
        if options.auto_generate {
            pass.generate()?;
        }
        Ok(pass)
    }

    /// Track `path` under its file name.
    ///
    /// # Errors
    ///
    /// [`PassError::InvalidState`] once the pass is packaged, plus any
    /// error of [`FileSet::add`].
    pub fn add_file(&mut self, path: &Path) -> PassResult<()> {
        self.ensure_not(&[PassState::Packaged, PassState::CleanedUp], "add file")?;
        if self.files.add(path)? {
            self.state = PassState::Created;
        }
        Ok(())
    }

    /// Track `path` under the archive entry `name`.
    pub fn add_file_as(&mut self, name: &str, path: &Path) -> PassResult<()> {
        self.ensure_not(&[PassState::Packaged, PassState::CleanedUp], "add file")?;
        if self.files.add_as(name, path)? {
            self.state = PassState::Created;
        }
        Ok(())
    }

    /// Override the key password for this pass only.
    pub fn set_password(&mut self, password: Password) {
        self.password = Some(password);
    }

    /// Digest every tracked file and write `manifest.json` to the workspace.
    pub fn build_manifest(&mut self) -> PassResult<Manifest> {
        self.ensure_not(&[PassState::CleanedUp], "build manifest")?;
        let path = self.workspace.manifest_path();
        let result = Manifest::build(&self.files, self.config.digest_algorithm)
            .and_then(|manifest| manifest.write_to(&path).map(|()| manifest));
        let manifest = self.record(result)?;
        self.state = PassState::ManifestBuilt;
        Ok(manifest)
    }

    /// Sign the manifest with the configured credentials.
    pub fn sign(&mut self) -> PassResult<()> {
        let credentials =
            SigningCredentials::from_config(self.config).with_password(self.password.clone());
        self.sign_with(&credentials)
    }

    /// Sign the manifest with explicit credentials.
    ///
    /// # Errors
    ///
    /// See [`sign_manifest`]. Signing before the manifest exists fails with
    /// [`PassError::ManifestNotFound`].
    pub fn sign_with(&mut self, credentials: &SigningCredentials) -> PassResult<()> {
        self.ensure_not(&[PassState::CleanedUp], "sign")?;
        let result = sign_manifest(
            self.backend,
            &self.workspace.manifest_path(),
            &self.workspace.signature_path(),
            credentials,
        );
        self.record(result)?;
        self.state = PassState::Signed;
        Ok(())
    }

    /// Check the workspace signature against the workspace manifest.
    pub fn verify(&self) -> PassResult<bool> {
        self.ensure_not(&[PassState::CleanedUp], "verify")?;
        verify_signature(
            self.backend,
            &self.workspace.signature_path(),
            &self.workspace.manifest_path(),
        )
    }

    /// Verify, then write the archive to the output path.
    ///
    /// Only a freshly signed pass can be packaged, so the archived manifest
    /// always covers every tracked file.
    ///
    /// # Errors
    ///
    /// - [`PassError::InvalidState`] unless the pass is [`PassState::Signed`].
    /// - [`PassError::SignatureNotFound`] if the signature is missing or does
    ///   not verify; the output path is left untouched in that case.
    pub fn package(&mut self) -> PassResult<()> {
        if self.state != PassState::Signed {
            return Err(self.invalid_state("package"));
        }
        let result = self.write_package();
        self.record(result)?;
        self.state = PassState::Packaged;
        Ok(())
    }

    fn write_package(&self) -> PassResult<()> {
        if !self.verify()? {
            return Err(PassError::SignatureNotFound {
                context: "no valid signature for the manifest; refusing to package".to_string(),
            });
        }
        if self.files.is_empty() {
            tracing::warn!(output = %self.output.display(), "packaging a pass with no files");
        }

        let manifest = self.workspace.manifest_path();
        let signature = self.workspace.signature_path();
        let entries = [
            (MANIFEST_NAME, manifest.as_path()),
            (SIGNATURE_NAME, signature.as_path()),
        ]
        .into_iter()
        .chain(self.files.iter());
        write_archive(&self.output, entries, self.options.allow_overwrite)
    }

    /// Remove the workspace (unless temp files are kept).
    ///
    /// Safe to call more than once.
    pub fn cleanup(&mut self) -> PassResult<()> {
        self.workspace.cleanup()?;
        self.state = PassState::CleanedUp;
        Ok(())
    }

    /// Build, sign, package and clean up.
    ///
    /// Stops at the first error without retrying or cleaning up; the pass
    /// is then [`PassState::Failed`] and the workspace stays on disk.
    pub fn generate(&mut self) -> PassResult<()> {
        self.build_manifest()?;
        self.sign()?;
        self.package()?;
        self.cleanup()?;
        tracing::info!(
            output = %self.output.display(),
            files = self.files.len(),
            backend = self.backend.name(),
            "generated pass"
        );
        Ok(())
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.workspace.manifest_path()
    }

    pub fn signature_path(&self) -> PathBuf {
        self.workspace.signature_path()
    }

    fn ensure_not(&self, forbidden: &[PassState], operation: &str) -> PassResult<()> {
        if forbidden.contains(&self.state) {
            return Err(self.invalid_state(operation));
        }
        Ok(())
    }

    fn invalid_state(&self, operation: &str) -> PassError {
        PassError::InvalidState {
            state: self.state.to_string(),
            operation: operation.to_string(),
        }
    }

    fn record<T>(&mut self, result: PassResult<T>) -> PassResult<T> {
        if let Err(err) = &result {
            tracing::debug!(
                workspace = %self.workspace.path().display(),
                previous = %self.state,
                error = %err,
                "pass step failed"
            );
            self.state = PassState::Failed;
        }
        result
    }
}

/// Remove the workspace of a pass that was never handed to the caller.
fn discard_workspace(workspace: &Workspace) {
    if let Err(err) = workspace.cleanup() {
        tracing::warn!(
            workspace = %workspace.path().display(),
            error = %err,
            "could not remove unused pass workspace"
        );
    }
}
