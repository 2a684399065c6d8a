//! # Manifest Builder
//!
//! The manifest is a flat JSON object mapping each entry name to the
//! lowercase hex digest of the file's content. It is rebuilt from scratch on
//! every call and serialized with sorted keys, so a stable file set yields a
//! byte-identical document.
//!
//! The bytes follow the layout the wallet platform's reference tooling
//! emits: `", "` between members, `": "` after keys, and non-ASCII
//! characters escaped as lowercase `\uXXXX` UTF-16 units:
//!
//! ```text
//! {"icon.png": "0a4d...", "pass.json": "7c21..."}
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use pkpass_core::{DigestAlgorithm, PassError, PassResult};
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::files::FileSet;

/// Digests of every tracked file, keyed by entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Digest every file in `files` with `algorithm`.
    ///
    /// An empty set produces an empty manifest and a warning.
    ///
    /// # Errors
    ///
    /// [`PassError::Io`] if a tracked file cannot be read.
    pub fn build(files: &FileSet, algorithm: DigestAlgorithm) -> PassResult<Self> {
        if files.is_empty() {
            tracing::warn!("building manifest for an empty file set");
        }
        let mut entries = BTreeMap::new();
        for (name, source) in files.iter() {
            let digest = algorithm.hex_digest_file(source)?;
            tracing::trace!(entry = name, %digest, "digested pass file");
            entries.insert(name.to_string(), digest);
        }
        Ok(Self { entries })
    }

    /// Read a manifest document.
    ///
    /// # Errors
    ///
    /// [`PassError::ManifestNotFound`] if `path` does not exist,
    /// [`PassError::Json`] if it is not a flat object of strings.
    pub fn load(path: &Path) -> PassResult<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PassError::ManifestNotFound {
                    context: format!("{} does not exist", path.display()),
                });
            }
            Err(e) => return Err(PassError::Io(e)),
        };
        let entries = serde_json::from_slice(&bytes)?;
        Ok(Self { entries })
    }

    /// The serialized document.
    pub fn to_bytes(&self) -> PassResult<Vec<u8>> {
        let mut out = Vec::with_capacity(64 * (self.entries.len() + 1));
        let mut ser = serde_json::Serializer::with_formatter(&mut out, ManifestFormatter);
        self.entries.serialize(&mut ser)?;
        Ok(out)
    }

    /// Write the document to `path`, replacing any previous content.
    pub fn write_to(&self, path: &Path) -> PassResult<()> {
        std::fs::write(path, self.to_bytes()?)?;
        tracing::debug!(manifest = %path.display(), entries = self.entries.len(), "wrote manifest");
        Ok(())
    }

    /// Hex digest recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Single-line JSON with spaced separators and ASCII-only output.
struct ManifestFormatter;

impl Formatter for ManifestFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
