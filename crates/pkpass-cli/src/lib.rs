//! # pkpass-cli: Command-Line Interface
//!
//! Provides the `pkpass` binary.
//!
//! ## Subcommands
//!
//! - `pkpass generate`: build, sign and package a pass with `openssl`.
//! - `pkpass manifest`: print the manifest a set of files would produce.
//! - `pkpass verify`: check a detached signature against a manifest.
//!
//! Files are given either as a plain path, tracked under its file name, or as
//! `NAME=PATH` to place it at a specific archive entry:
//!
//! ```bash
//! pkpass generate --output boarding.pkpass pass.json logo.png en.lproj/pass.strings=strings/en.txt
//! ```

pub mod generate;
pub mod manifest;
pub mod verify;

use std::path::PathBuf;

use anyhow::anyhow;
use pkpass_core::PassError;
use pkpass_pack::FileSet;

/// A file argument: `PATH` or `NAME=PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    /// Explicit archive entry name.
    pub name: Option<String>,
    pub path: PathBuf,
}

/// clap value parser for [`FileArg`].
pub fn parse_file_arg(raw: &str) -> Result<FileArg, String> {
    match raw.split_once('=') {
        Some((name, path)) => {
            if name.is_empty() || path.is_empty() {
                return Err(format!("expected NAME=PATH, got {raw:?}"));
            }
            Ok(FileArg {
                name: Some(name.to_string()),
                path: PathBuf::from(path),
            })
        }
        None => Ok(FileArg {
            name: None,
            path: PathBuf::from(raw),
        }),
    }
}

/// Collect file arguments into a [`FileSet`].
pub fn file_set(files: &[FileArg]) -> Result<FileSet, PassError> {
    let mut set = FileSet::new();
    for file in files {
        match &file.name {
            Some(name) => set.add_as(name, &file.path)?,
            None => set.add(&file.path)?,
        };
    }
    Ok(set)
}

/// Turn a pass error into a CLI error naming its catalogue entry.
pub fn describe(err: PassError, operation: &str) -> anyhow::Error {
    let kind = err.kind();
    anyhow!(
        "{operation} failed [{} {}]: {err}",
        kind.mnemonic(),
        kind.catalog_number()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkpass_core::ErrorKind;

    #[test]
    fn plain_path() {
        let arg = parse_file_arg("assets/logo.png").unwrap();
        assert_eq!(arg.name, None);
        assert_eq!(arg.path, PathBuf::from("assets/logo.png"));
    }

    #[test]
    fn named_path() {
        let arg = parse_file_arg("en.lproj/pass.strings=strings/en.txt").unwrap();
        assert_eq!(arg.name.as_deref(), Some("en.lproj/pass.strings"));
        assert_eq!(arg.path, PathBuf::from("strings/en.txt"));
    }

    #[test]
    fn incomplete_named_path() {
        assert!(parse_file_arg("=logo.png").is_err());
        assert!(parse_file_arg("logo.png=").is_err());
    }

    #[test]
    fn file_set_from_args() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, b"logo").unwrap();
        let args = [
            FileArg { name: None, path: logo.clone() },
            FileArg { name: Some("images/icon.png".to_string()), path: logo },
        ];
        let set = file_set(&args).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.get("images/icon.png").is_some());
    }

    #[test]
    fn describe_names_catalogue_entry() {
        let err = PassError::IncorrectPassword {
            context: "signing manifest".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::IncorrectPassword);
        let msg = format!("{}", describe(err, "generate"));
        assert!(msg.contains("PB_EXP_PASSWORD 101"));
        assert!(msg.starts_with("generate failed"));
    }
}
