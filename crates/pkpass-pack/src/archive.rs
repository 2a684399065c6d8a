//! # Pass Archive Writer
//!
//! Writes the deflate-compressed zip container. The archive is assembled in
//! a temporary file in the output's directory and renamed into place only
//! once complete, so the output path either holds a finished archive or
//! nothing at all.

use std::fs::File;
use std::io;
use std::path::Path;

use pkpass_core::{PassError, PassResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write an archive at `output` holding each `(entry name, source)` pair.
///
/// Entries are written in the given order. When `overwrite` is false the
/// final rename refuses to replace a file that appeared at `output` in the
/// meantime.
///
/// # Errors
///
/// - [`PassError::PathNotAvailable`] if `output` exists and `overwrite` is
///   false.
/// - [`PassError::Archive`] if the zip writer fails.
/// - [`PassError::Io`] if a source cannot be read or the rename fails.
pub fn write_archive<'a, I>(output: &Path, entries: I, overwrite: bool) -> PassResult<()>
where
    I: IntoIterator<Item = (&'a str, &'a Path)>,
{
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".pkpass-")
        .suffix(".partial")
        .tempfile_in(dir)?;

    let mut writer = ZipWriter::new(staging.as_file());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0usize;
    for (name, source) in entries {
        writer
            .start_file(name, options)
            .map_err(|e| archive_error(name, e))?;
        let mut input = File::open(source)?;
        io::copy(&mut input, &mut writer)?;
        count += 1;
    }
    writer.finish().map_err(|e| archive_error("central directory", e))?;
    staging.as_file().sync_all()?;

    let persisted = if overwrite {
        staging.persist(output)
    } else {
        staging.persist_noclobber(output)
    };
    match persisted {
        Ok(_) => {}
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            return Err(PassError::PathNotAvailable {
                path: output.to_path_buf(),
                context: "output appeared while the archive was being written".to_string(),
            });
        }
        Err(e) => return Err(PassError::Io(e.error)),
    }

    tracing::debug!(output = %output.display(), entries = count, "wrote pass archive");
    Ok(())
}

fn archive_error(entry: &str, err: zip::result::ZipError) -> PassError {
    PassError::Archive {
        context: format!("writing {entry}: {err}"),
    }
}
