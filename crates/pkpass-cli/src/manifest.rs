//! # Manifest Subcommand
//!
//! Prints (or writes) the manifest document a set of files would get,
//! without signing anything.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pkpass_core::PassConfig;
use pkpass_pack::Manifest;

use crate::{describe, file_set, parse_file_arg, FileArg};

/// Arguments for `pkpass manifest`.
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Write the manifest here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Files to digest, as `PATH` or `NAME=PATH`.
    #[arg(value_name = "FILE", value_parser = parse_file_arg)]
    pub files: Vec<FileArg>,
}

/// Execute the manifest subcommand.
pub fn run_manifest(args: &ManifestArgs, config: &PassConfig) -> Result<u8> {
    let files = file_set(&args.files).map_err(|e| describe(e, "manifest"))?;
    let manifest =
        Manifest::build(&files, config.digest_algorithm).map_err(|e| describe(e, "manifest"))?;

    match &args.output {
        Some(path) => {
            manifest
                .write_to(path)
                .map_err(|e| describe(e, "manifest"))
                .with_context(|| format!("writing {}", path.display()))?;
            println!("OK: wrote {} ({} entries)", path.display(), manifest.len());
        }
        None => {
            let bytes = manifest.to_bytes().map_err(|e| describe(e, "manifest"))?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
    }
    Ok(0)
}
