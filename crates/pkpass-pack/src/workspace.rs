//! # Pass Workspace
//!
//! Every pass assembles its manifest and signature inside a private
//! directory named `tmp_<suffix>`, where the suffix is the first 16 hex
//! characters of a random v4 UUID. The directory is created with a single
//! `create_dir` call, which fails if the path exists, so concurrent passes
//! never share a workspace.
//!
//! A workspace is removed only by an explicit [`Workspace::cleanup`]. Dropping
//! it leaves the directory in place so that a failed pipeline can be
//! inspected afterwards.

use std::io;
use std::path::{Path, PathBuf};

use pkpass_core::{PassError, PassResult, MANIFEST_NAME, SIGNATURE_NAME};

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "tmp_";

const SUFFIX_LEN: usize = 16;

/// A private, uniquely named directory holding one pass's intermediate files.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Create a fresh workspace under `root`.
    ///
    /// `root` is created first if missing. With `keep` set, [`cleanup`]
    /// never removes the directory.
    ///
    /// # Errors
    ///
    /// [`PassError::PathAlreadyExists`] if the generated directory exists
    /// already (no retry is attempted); any other OS error as
    /// [`PassError::Io`].
    ///
    /// [`cleanup`]: Workspace::cleanup
    pub fn create(root: &Path, keep: bool) -> PassResult<Self> {
        std::fs::create_dir_all(root)?;
        let path = root.join(directory_name());
        match std::fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(PassError::PathAlreadyExists {
                    path,
                    context: "creating pass workspace".to_string(),
                });
            }
            Err(e) => return Err(PassError::Io(e)),
        }
        tracing::debug!(workspace = %path.display(), keep, "created pass workspace");
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<workspace>/manifest.json`.
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_NAME)
    }

    /// `<workspace>/signature`.
    pub fn signature_path(&self) -> PathBuf {
        self.path.join(SIGNATURE_NAME)
    }

    /// Remove the directory and everything in it.
    ///
    /// A missing directory is not an error, so repeated calls are harmless.
    /// In keep mode this does nothing.
    pub fn cleanup(&self) -> PassResult<()> {
        if self.keep {
            tracing::debug!(workspace = %self.path.display(), "keeping pass workspace");
            return Ok(());
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                tracing::debug!(workspace = %self.path.display(), "removed pass workspace");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PassError::Io(e)),
        }
    }
}

fn directory_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{WORKSPACE_PREFIX}{}", &id[..SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_name_shape() {
        let name = directory_name();
        assert!(name.starts_with(WORKSPACE_PREFIX));
        let suffix = &name[WORKSPACE_PREFIX.len()..];
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn create_makes_unique_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path(), false).unwrap();
        let b = Workspace::create(root.path(), false).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
        assert_eq!(a.manifest_path(), a.path().join("manifest.json"));
        assert_eq!(a.signature_path(), a.path().join("signature"));
    }

    #[test]
    fn create_builds_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("work").join("passes");
        let ws = Workspace::create(&nested, false).unwrap();
        assert!(ws.path().starts_with(&nested));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), false).unwrap();
        std::fs::write(ws.manifest_path(), "{}").unwrap();
        ws.cleanup().unwrap();
        assert!(!ws.path().exists());
        ws.cleanup().unwrap();
        assert!(!ws.path().exists());
    }

    #[test]
    fn keep_mode_survives_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), true).unwrap();
        ws.cleanup().unwrap();
        ws.cleanup().unwrap();
        assert!(ws.path().is_dir());
    }

    #[test]
    fn drop_does_not_remove() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create(root.path(), false).unwrap();
            ws.path().to_path_buf()
        };
        assert!(path.is_dir());
    }
}
