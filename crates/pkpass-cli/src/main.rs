//! # pkpass CLI entry point
//!
//! Parses command-line arguments, loads the process-wide configuration and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pkpass_cli::generate::{run_generate, GenerateArgs};
use pkpass_cli::manifest::{run_manifest, ManifestArgs};
use pkpass_cli::verify::{run_verify, VerifyArgs};
use pkpass_core::config::{self, PassConfig};

/// Build, sign and package wallet passes.
///
/// Signing defaults come from an optional YAML file (`--config`) and the
/// `PKPASS_*` environment variables, in that order.
#[derive(Parser, Debug)]
#[command(name = "pkpass", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, sign and package a pass.
    Generate(GenerateArgs),

    /// Print the manifest for a set of files.
    Manifest(ManifestArgs),

    /// Verify a detached manifest signature.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "pkpass CLI starting");

    let result = load_config(&cli).and_then(|config| match &cli.command {
        Commands::Generate(args) => run_generate(args, config),
        Commands::Manifest(args) => run_manifest(args, config),
        Commands::Verify(args) => run_verify(args, config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<&'static PassConfig> {
    let loaded = PassConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let installed = config::install(loaded).context("installing configuration")?;
    tracing::debug!(
        certificate = %installed.certificate.display(),
        digest = %installed.digest_algorithm,
        keep_temp_files = installed.keep_temp_files,
        "configuration loaded"
    );
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parse_generate() {
        let cli = Cli::try_parse_from([
            "pkpass",
            "-vv",
            "generate",
            "--output",
            "boarding.pkpass",
            "--allow-overwrite",
            "pass.json",
            "logo.png",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Generate(args) => {
                assert!(args.allow_overwrite);
                assert_eq!(args.files.len(), 2);
            }
            other => panic!("expected generate, got {other:?}"),
        }
    }

    #[test]
    fn cli_parse_manifest() {
        let cli = Cli::try_parse_from(["pkpass", "manifest", "logo.png"]).unwrap();
        assert!(matches!(cli.command, Commands::Manifest(_)));
    }

    #[test]
    fn cli_parse_verify_with_global_flags() {
        let cli = Cli::try_parse_from([
            "pkpass",
            "verify",
            "--signature",
            "signature",
            "--manifest",
            "manifest.json",
            "--config",
            "pkpass.yaml",
            "--json-logs",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Verify(_)));
        assert_eq!(cli.config, Some(PathBuf::from("pkpass.yaml")));
        assert!(cli.json_logs);
    }

    #[test]
    fn cli_verify_requires_manifest() {
        assert!(Cli::try_parse_from(["pkpass", "verify", "--signature", "signature"]).is_err());
    }
}
