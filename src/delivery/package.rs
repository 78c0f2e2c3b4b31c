//! Zip packaging of a finished mashup.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{MashupError, Result};

/// Returns the archive path for a mashup: same directory and stem, `.zip`.
pub fn zip_path_for(mashup: &Path) -> PathBuf {
    mashup.with_extension("zip")
}

/// Packs `mashup` into a single-entry zip next to it and returns the zip path.
///
/// The entry is named after the mashup's file name. A partially written
/// archive is removed on failure.
pub fn package_zip(mashup: &Path) -> Result<PathBuf> {
    let entry_name = mashup
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            MashupError::packaging_failed(format!("{} has no file name", mashup.display()))
        })?;
    let zip_path = zip_path_for(mashup);

    if let Err(e) = write_archive(mashup, &zip_path, &entry_name) {
        remove_partial(&zip_path);
        return Err(MashupError::packaging_failed(format!(
            "Failed to package {}: {}",
            entry_name, e
        )));
    }

    debug!(zip = %zip_path.display(), entry = %entry_name, "mashup packaged");
    Ok(zip_path)
}

fn remove_partial(zip_path: &Path) {
    match std::fs::remove_file(zip_path) {
        Ok(()) => debug!(zip = %zip_path.display(), "partial archive removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(zip = %zip_path.display(), error = %e, "failed to remove partial archive"),
    }
}

fn write_archive(source: &Path, zip_path: &Path, entry_name: &str) -> io::Result<()> {
    let mut input = BufReader::new(File::open(source)?);
    let mut writer = ZipWriter::new(BufWriter::new(File::create(zip_path)?));

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer
        .start_file(entry_name, options)
        .map_err(io::Error::other)?;
    io::copy(&mut input, &mut writer)?;
    writer.finish().map_err(io::Error::other)?;
    Ok(())
}
