//! # Manifest Digests
//!
//! Content digests recorded for every file in a pass manifest. The algorithm
//! is a process-wide setting, never chosen per call: a manifest mixing
//! algorithms would be rejected by the wallet platform.
//!
//! Digests are rendered as lowercase hex, the format the manifest document
//! stores.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hash algorithm used for manifest entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, the algorithm wallet pass manifests are defined with.
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Lowercase name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Digest an in-memory buffer.
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            Self::Sha1 => to_hex(&Sha1::digest(data)),
            Self::Sha256 => to_hex(&Sha256::digest(data)),
        }
    }

    /// Digest everything readable from `reader`.
    pub fn hex_digest_reader<R: Read>(self, reader: R) -> io::Result<String> {
        match self {
            Self::Sha1 => stream_digest::<Sha1, R>(reader),
            Self::Sha256 => stream_digest::<Sha256, R>(reader),
        }
    }

    /// Digest the full content of the file at `path`.
    pub fn hex_digest_file(self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        self.hex_digest_reader(BufReader::new(file))
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("unsupported digest algorithm {other:?} (expected sha1 or sha256)")),
        }
    }
}

fn stream_digest<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
