//! # Generate Subcommand
//!
//! Runs the full pipeline with the `openssl` backend. Command-line flags
//! override the loaded configuration for this run only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use pkpass_core::PassConfig;
use pkpass_crypto::{OpensslCli, SmimeBackend};
use pkpass_pack::{Pass, PassOptions};

use crate::{describe, parse_file_arg, FileArg};

/// Arguments for `pkpass generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Destination `.pkpass` file.
    #[arg(long, short)]
    pub output: PathBuf,

    /// Replace the output file if it exists.
    #[arg(long)]
    pub allow_overwrite: bool,

    /// Keep the pass workspace after a successful run.
    #[arg(long)]
    pub keep_temp_files: bool,

    /// PEM signing certificate.
    #[arg(long)]
    pub certificate: Option<PathBuf>,

    /// PEM private key.
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Intermediate certificate to embed in the signature.
    #[arg(long)]
    pub wwdr_certificate: Option<PathBuf>,

    /// Kill `openssl` after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Files to include, as `PATH` or `NAME=PATH`.
    #[arg(value_name = "FILE", value_parser = parse_file_arg)]
    pub files: Vec<FileArg>,
}

impl GenerateArgs {
    /// The base configuration with this run's flags applied.
    pub fn apply_overrides(&self, base: &PassConfig) -> PassConfig {
        let mut config = base.clone();
        if let Some(certificate) = &self.certificate {
            config.certificate = certificate.clone();
        }
        if let Some(key) = &self.key {
            config.key = key.clone();
        }
        if self.wwdr_certificate.is_some() {
            config.wwdr_certificate = self.wwdr_certificate.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.signer_timeout = Some(Duration::from_secs(secs));
        }
        if self.keep_temp_files {
            config.keep_temp_files = true;
        }
        config
    }
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs, base: &PassConfig) -> Result<u8> {
    let config = args.apply_overrides(base);
    let backend = OpensslCli::from_config(&config);
    generate_with(args, &config, &backend)
}

fn generate_with(
    args: &GenerateArgs,
    config: &PassConfig,
    backend: &dyn SmimeBackend,
) -> Result<u8> {
    let options = PassOptions {
        allow_overwrite: args.allow_overwrite,
        auto_generate: false,
    };
    let mut pass = Pass::new(&args.output, Vec::<&Path>::new(), options, config, backend)
        .map_err(|e| describe(e, "generate"))?;
    for file in &args.files {
        let added = match &file.name {
            Some(name) => pass.add_file_as(name, &file.path),
            None => pass.add_file(&file.path),
        };
        added.map_err(|e| describe(e, "generate"))?;
    }

    if let Err(err) = pass.generate() {
        tracing::warn!(
            workspace = %pass.workspace_path().display(),
            "pass workspace kept for inspection"
        );
        return Err(describe(err, "generate"));
    }

    println!("OK: wrote {}", args.output.display());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: GenerateArgs,
    }

    fn parse(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["generate"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "--output",
            "out.pkpass",
            "--certificate",
            "signing/cert.pem",
            "--wwdr-certificate",
            "signing/wwdr.pem",
            "--timeout-secs",
            "15",
            "--keep-temp-files",
            "logo.png",
        ]);
        let config = args.apply_overrides(&PassConfig::default());
        assert_eq!(config.certificate, PathBuf::from("signing/cert.pem"));
        assert_eq!(config.key, PathBuf::from("key.pem"));
        assert_eq!(config.wwdr_certificate, Some(PathBuf::from("signing/wwdr.pem")));
        assert_eq!(config.signer_timeout, Some(Duration::from_secs(15)));
        assert!(config.keep_temp_files);
    }

    #[test]
    fn absent_flags_keep_config() {
        let base = PassConfig {
            keep_temp_files: true,
            wwdr_certificate: Some(PathBuf::from("wwdr.pem")),
            ..PassConfig::default()
        };
        let args = parse(&["--output", "out.pkpass"]);
        let config = args.apply_overrides(&base);
        assert!(config.keep_temp_files);
        assert_eq!(config.wwdr_certificate, Some(PathBuf::from("wwdr.pem")));
        assert!(args.files.is_empty());
    }

    #[test]
    fn named_files_parse() {
        let args = parse(&["-o", "out.pkpass", "logo.png", "en.lproj/pass.strings=en.txt"]);
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.files[1].name.as_deref(), Some("en.lproj/pass.strings"));
    }

    #[test]
    fn missing_certificate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), b"logo").unwrap();
        let output = dir.path().join("out.pkpass");
        let logo = dir.path().join("logo.png");
        let args = parse(&[
            "--output",
            output.to_str().unwrap(),
            "--certificate",
            "/nonexistent/cert.pem",
            logo.to_str().unwrap(),
        ]);
        let base = PassConfig {
            workspace_root: dir.path().join("work"),
            ..PassConfig::default()
        };
        let err = run_generate(&args, &base).unwrap_err();
        assert!(format!("{err}").contains("PB_CERT_NOTFOUND"));
        assert!(!output.exists());
    }

    #[test]
    fn generate_with_mock_backend() {
        let dir = tempfile::tempdir().unwrap();
        let certificate = dir.path().join("cert.pem");
        let logo = dir.path().join("logo.png");
        let strings = dir.path().join("en.txt");
        std::fs::write(&certificate, "cert").unwrap();
        std::fs::write(&logo, b"logo").unwrap();
        std::fs::write(&strings, "\"title\" = \"Boarding\";").unwrap();
        let output = dir.path().join("out.pkpass");
        let args = parse(&[
            "--output",
            output.to_str().unwrap(),
            logo.to_str().unwrap(),
            &format!("en.lproj/pass.strings={}", strings.display()),
        ]);
        let config = PassConfig {
            certificate,
            workspace_root: dir.path().join("work"),
            ..PassConfig::default()
        };
        let backend = pkpass_crypto::MockSmimeBackend::new();
        assert_eq!(generate_with(&args, &config, &backend).unwrap(), 0);
        assert!(output.exists());
        assert_eq!(backend.sign_calls(), 1);
    }
}
