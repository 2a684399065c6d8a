//! # Verify Subcommand
//!
//! Checks a detached signature against a manifest with `openssl`, skipping
//! certificate chain validation. The manifest must parse as a flat digest
//! object before the signature is checked. Prints `OK` and exits 0 when the
//! signature verifies, `FAIL` and exits 1 otherwise.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pkpass_core::PassConfig;
use pkpass_crypto::{verify_signature, OpensslCli, SmimeBackend};
use pkpass_pack::Manifest;

use crate::describe;

/// Arguments for `pkpass verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// DER signature file.
    #[arg(long)]
    pub signature: PathBuf,

    /// Manifest the signature should cover.
    #[arg(long)]
    pub manifest: PathBuf,
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs, config: &PassConfig) -> Result<u8> {
    verify_with(args, &OpensslCli::from_config(config))
}

fn verify_with(args: &VerifyArgs, backend: &dyn SmimeBackend) -> Result<u8> {
    let manifest = Manifest::load(&args.manifest).map_err(|e| describe(e, "verify"))?;
    let valid = verify_signature(backend, &args.signature, &args.manifest)
        .map_err(|e| describe(e, "verify"))?;
    if valid {
        println!(
            "OK: {} verifies ({} entries)",
            args.signature.display(),
            manifest.len()
        );
        Ok(0)
    } else {
        println!("FAIL: {} does not verify", args.signature.display());
        Ok(1)
    }
}
