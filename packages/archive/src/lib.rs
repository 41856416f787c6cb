#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Archive extraction for zipped geometry inputs.
//!
//! The municipality boundaries ship as a zip archive. The pipeline's only
//! contract with downstream loaders is "the GeoJSON exists at a known path
//! before load"; [`ensure_extracted`] upholds it by unpacking the archive
//! when the target file is not already on disk.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while ensuring an input is extracted.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Neither the target file nor its archive could be located.
    #[error("Missing input: neither {target} nor archive {archive} exists")]
    MissingInput {
        /// File the loaders need.
        target: PathBuf,
        /// Archive expected to contain it.
        archive: PathBuf,
    },

    /// The archive extracted cleanly but did not contain the target file.
    #[error("Archive {archive} did not produce {target}")]
    MissingEntry {
        /// File the loaders need.
        target: PathBuf,
        /// Archive that was extracted.
        archive: PathBuf,
    },

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive is corrupt or unreadable.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Makes sure `target` exists, extracting `archive` beside it if needed.
///
/// A target already on disk short-circuits without touching the archive;
/// extraction never runs twice for the same file.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingInput`] when both files are absent,
/// [`ArchiveError::MissingEntry`] when extraction did not produce the
/// target, and IO/zip errors otherwise.
pub fn ensure_extracted(target: &Path, archive: &Path) -> Result<(), ArchiveError> {
    if target.exists() {
        log::debug!("{} already present, skipping extraction", target.display());
        return Ok(());
    }

    if !archive.exists() {
        return Err(ArchiveError::MissingInput {
            target: target.to_path_buf(),
            archive: archive.to_path_buf(),
        });
    }

    log::info!(
        "Extracting {} for {}",
        archive.display(),
        target.display()
    );

    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    let dir = target.parent().filter(|p| !p.as_os_str().is_empty());
    zip.extract(dir.unwrap_or_else(|| Path::new(".")))?;

    if target.exists() {
        Ok(())
    } else {
        Err(ArchiveError::MissingEntry {
            target: target.to_path_buf(),
            archive: archive.to_path_buf(),
        })
    }
}
