//! Tracked files and their archive entry names.
//!
//! An entry name is the path a file gets inside the archive. It defaults to
//! the source's file name and may be given explicitly for files that belong
//! in a subdirectory such as `en.lproj/pass.strings`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pkpass_core::{PassError, PassResult, MANIFEST_NAME, SIGNATURE_NAME};

/// Set of files to include in a pass, keyed by entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: BTreeMap<String, PathBuf>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `source` under its own file name.
    pub fn add(&mut self, source: &Path) -> PassResult<bool> {
        let name = default_entry_name(source)?;
        self.add_as(&name, source)
    }

    /// Track `source` under `name`.
    ///
    /// Returns `false` when the same file is already tracked under that name.
    ///
    /// # Errors
    ///
    /// - [`PassError::FileNotFound`] if `source` is not an existing file.
    /// - [`PassError::PathNotAvailable`] if `name` is invalid or reserved.
    /// - [`PassError::PathAlreadyExists`] if `name` already tracks a
    ///   different file.
    pub fn add_as(&mut self, name: &str, source: &Path) -> PassResult<bool> {
        validate_entry_name(name)?;
        if !source.is_file() {
            return Err(PassError::FileNotFound {
                path: source.to_path_buf(),
                context: format!("tracking pass file {name}"),
            });
        }
        match self.entries.get(name) {
            Some(existing) if existing == source => Ok(false),
            Some(existing) => Err(PassError::PathAlreadyExists {
                path: PathBuf::from(name),
                context: format!("entry already tracks {}", existing.display()),
            }),
            None => {
                tracing::debug!(entry = name, source = %source.display(), "tracking pass file");
                self.entries.insert(name.to_string(), source.to_path_buf());
                Ok(true)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(entry name, source)` pairs in entry-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_path()))
    }
}

/// The entry name a file is tracked under when none is given.
pub fn default_entry_name(source: &Path) -> PassResult<String> {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| PassError::PathNotAvailable {
            path: source.to_path_buf(),
            context: "source has no usable file name".to_string(),
        })
}

/// Check that `name` is a relative, `/`-separated path without `.` or `..`
/// components, and is not one of the reserved entry names.
pub fn validate_entry_name(name: &str) -> PassResult<()> {
    let reject = |reason: &str| -> PassResult<()> {
        Err(PassError::PathNotAvailable {
            path: PathBuf::from(name),
            context: reason.to_string(),
        })
    };
    if name.is_empty() {
        return reject("entry name is empty");
    }
    if name == MANIFEST_NAME || name == SIGNATURE_NAME {
        return reject("entry name is reserved");
    }
    if name.starts_with('/') || name.contains('\\') {
        return reject("entry name must be a relative path with '/' separators");
    }
    if name
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return reject("entry name has an empty, '.' or '..' component");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkpass_core::ErrorKind;

    fn file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn add_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let logo = file(dir.path(), "logo.png");
        let mut set = FileSet::new();
        assert!(set.add(&logo).unwrap());
        assert_eq!(set.get("logo.png"), Some(logo.as_path()));
    }

    #[test]
    fn adding_same_file_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let logo = file(dir.path(), "logo.png");
        let mut set = FileSet::new();
        assert!(set.add(&logo).unwrap());
        assert!(!set.add(&logo).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn name_collision_with_other_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let a = file(dir.path(), "icon.png");
        let b = file(&dir.path().join("b"), "icon.png");
        let mut set = FileSet::new();
        set.add(&a).unwrap();
        let err = set.add(&b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathAlreadyExists);
    }

    #[test]
    fn missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSet::new().add(&dir.path().join("absent.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSet::new().add_as("assets", dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn nested_entry_names_are_accepted() {
        assert!(validate_entry_name("en.lproj/pass.strings").is_ok());
        assert!(validate_entry_name("logo@2x.png").is_ok());
    }

    #[test]
    fn invalid_entry_names() {
        for name in [
            "",
            "manifest.json",
            "signature",
            "/etc/passwd",
            "../logo.png",
            "a/./b",
            "a//b",
            "dir/",
            "win\\path.png",
        ] {
            let err = validate_entry_name(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathNotAvailable, "{name:?}");
        }
    }

    #[test]
    fn iteration_is_sorted_by_entry_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = FileSet::new();
        set.add(&file(dir.path(), "thumbnail.png")).unwrap();
        set.add(&file(dir.path(), "icon.png")).unwrap();
        set.add(&file(dir.path(), "pass.json")).unwrap();
        let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["icon.png", "pass.json", "thumbnail.png"]);
    }
}
