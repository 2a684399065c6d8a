//! Process-wide signing configuration.
//!
//! Defaults for the signing certificate, private key, key password, temp-file
//! retention and digest algorithm are shared by every pass in a process. They
//! are loaded once at startup (defaults, then an optional YAML file, then
//! `PKPASS_*` environment variables) and handed to each pass by reference, so
//! tests can build their own [`PassConfig`] without touching shared state.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::digest::DigestAlgorithm;

static GLOBAL: OnceLock<PassConfig> = OnceLock::new();

/// Password protecting the signing key.
///
/// Zeroized on drop. `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret itself. Only the signer backend should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Signing defaults shared by every pass in the process.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// PEM signing certificate. Default: `certificate.pem`.
    pub certificate: PathBuf,
    /// PEM private key. Default: `key.pem`.
    pub key: PathBuf,
    /// Intermediate (WWDR) certificate bundled into the signature, if any.
    pub wwdr_certificate: Option<PathBuf>,
    /// Password of the private key. `None` signs without one and warns.
    pub password: Option<Password>,
    /// Keep every pass workspace on disk, even after success.
    pub keep_temp_files: bool,
    /// Digest algorithm for manifest entries.
    pub digest_algorithm: DigestAlgorithm,
    /// Directory under which pass workspaces are created.
    pub workspace_root: PathBuf,
    /// The `openssl` executable.
    pub openssl: PathBuf,
    /// Kill the signing tool after this long. `None` waits indefinitely.
    pub signer_timeout: Option<Duration>,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            certificate: PathBuf::from("certificate.pem"),
            key: PathBuf::from("key.pem"),
            wwdr_certificate: None,
            password: None,
            keep_temp_files: false,
            digest_algorithm: DigestAlgorithm::Sha1,
            workspace_root: PathBuf::from("."),
            openssl: PathBuf::from("openssl"),
            signer_timeout: None,
        }
    }
}

/// YAML configuration file. Every field is optional and overrides the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    certificate: Option<PathBuf>,
    key: Option<PathBuf>,
    wwdr_certificate: Option<PathBuf>,
    password: Option<Password>,
    keep_temp_files: Option<bool>,
    digest_algorithm: Option<DigestAlgorithm>,
    workspace_root: Option<PathBuf>,
    openssl: Option<PathBuf>,
    signer_timeout_secs: Option<u64>,
}

impl PassConfig {
    /// Defaults overridden by `PKPASS_*` environment variables.
    ///
    /// Variables:
    /// - `PKPASS_CERTIFICATE` (default: `certificate.pem`)
    /// - `PKPASS_KEY` (default: `key.pem`)
    /// - `PKPASS_WWDR_CERTIFICATE` (default: none)
    /// - `PKPASS_PASSWORD` (default: none)
    /// - `PKPASS_KEEP_TEMP_FILES` (default: `false`)
    /// - `PKPASS_DIGEST` (default: `sha1`)
    /// - `PKPASS_WORKSPACE_ROOT` (default: `.`)
    /// - `PKPASS_OPENSSL` (default: `openssl`)
    /// - `PKPASS_SIGNER_TIMEOUT_SECS` (default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Defaults overridden by a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_file(path)?;
        Ok(config)
    }

    /// Defaults, then the optional YAML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::from_env();
        };
        let mut config = Self::from_yaml_file(path)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: ConfigFile = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(v) = file.certificate {
            self.certificate = v;
        }
        if let Some(v) = file.key {
            self.key = v;
        }
        if file.wwdr_certificate.is_some() {
            self.wwdr_certificate = file.wwdr_certificate;
        }
        if file.password.is_some() {
            self.password = file.password;
        }
        if let Some(v) = file.keep_temp_files {
            self.keep_temp_files = v;
        }
        if let Some(v) = file.digest_algorithm {
            self.digest_algorithm = v;
        }
        if let Some(v) = file.workspace_root {
            self.workspace_root = v;
        }
        if let Some(v) = file.openssl {
            self.openssl = v;
        }
        if let Some(secs) = file.signer_timeout_secs {
            self.signer_timeout = Some(Duration::from_secs(secs));
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PKPASS_CERTIFICATE") {
            self.certificate = PathBuf::from(v);
        }
        if let Some(v) = lookup("PKPASS_KEY") {
            self.key = PathBuf::from(v);
        }
        if let Some(v) = lookup("PKPASS_WWDR_CERTIFICATE") {
            self.wwdr_certificate = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PKPASS_PASSWORD") {
            self.password = Some(Password::new(v));
        }
        if let Some(v) = lookup("PKPASS_KEEP_TEMP_FILES") {
            self.keep_temp_files = parse_bool("PKPASS_KEEP_TEMP_FILES", &v)?;
        }
        if let Some(v) = lookup("PKPASS_DIGEST") {
            self.digest_algorithm = v.parse().map_err(|reason| ConfigError::InvalidValue {
                var: "PKPASS_DIGEST".to_string(),
                value: v.clone(),
                reason,
            })?;
        }
        if let Some(v) = lookup("PKPASS_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("PKPASS_OPENSSL") {
            self.openssl = PathBuf::from(v);
        }
        if let Some(v) = lookup("PKPASS_SIGNER_TIMEOUT_SECS") {
            let secs: u64 = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "PKPASS_SIGNER_TIMEOUT_SECS".to_string(),
                value: v.clone(),
                reason: "expected a whole number of seconds".to_string(),
            })?;
            self.signer_timeout = Some(Duration::from_secs(secs));
        }
        Ok(())
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Install the process-wide configuration. Succeeds once per process.
pub fn install(config: PassConfig) -> Result<&'static PassConfig, ConfigError> {
    let mut pending = Some(config);
    let installed = GLOBAL.get_or_init(|| pending.take().unwrap_or_default());
    if pending.is_some() {
        return Err(ConfigError::AlreadyInstalled);
    }
    Ok(installed)
}

/// The installed process-wide configuration, if any.
pub fn global() -> Option<&'static PassConfig> {
    GLOBAL.get()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
    #[error("process-wide configuration is already installed")]
    AlreadyInstalled,
}

/// Build an environment lookup from fixed pairs (test helper).
#[cfg(test)]
fn fixed_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    use std::collections::HashMap;

    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |var| map.get(var).cloned()
}
