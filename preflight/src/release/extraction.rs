//! Archive extraction for release tarballs.
//!
//! The pipeline treats extraction as an opaque capability behind
//! [`ReleaseExtractor`]. The default [`TarballExtractor`] unpacks tar
//! archives compressed with gzip or zstd (or not at all), guarding against
//! entries that would escape the destination directory.

use camino::Utf8Path;
use flate2::read::GzDecoder;
use log::trace;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Component, Path};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Trait for unpacking an archive into a directory, enabling test mocking.
///
/// # Examples
///
/// ```
/// use release_preflight::release::extraction::{ReleaseExtractor, TarballExtractor};
///
/// fn takes_extractor(_extractor: &dyn ReleaseExtractor) {}
/// takes_extractor(&TarballExtractor);
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseExtractor: Send + Sync {
    /// Extract the archive at `archive` into `destination`.
    ///
    /// `destination` must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape `destination`, [`ExtractionError::EmptyArchive`] if the archive
    /// has no entries, and [`ExtractionError::Io`] on I/O or decoding
    /// failures.
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<(), ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no entries.
    #[error("archive contains no entries")]
    EmptyArchive,
}

/// Compression layer detected from an archive's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// gzip (`.tgz`, `.tar.gz`).
    Gzip,
    /// Zstandard (`.tar.zst`).
    Zstd,
    /// Uncompressed tar.
    None,
}

impl Compression {
    /// Detect the compression layer from the first bytes of a file.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_preflight::release::extraction::Compression;
    ///
    /// assert_eq!(Compression::detect(&[0x1f, 0x8b, 0x08]), Compression::Gzip);
    /// assert_eq!(Compression::detect(b"ustar"), Compression::None);
    /// ```
    #[must_use]
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if prefix.starts_with(ZSTD_MAGIC) {
            Self::Zstd
        } else {
            Self::None
        }
    }
}

/// Default extractor using the `tar`, `flate2`, and `zstd` crates.
///
/// Validates each entry path before unpacking to guard against path
/// traversal (zip-slip).
#[derive(Debug, Clone, Copy, Default)]
pub struct TarballExtractor;

impl ReleaseExtractor for TarballExtractor {
    fn extract(&self, archive: &Utf8Path, destination: &Utf8Path) -> Result<(), ExtractionError> {
        let reader = open_decoded(archive)?;
        let mut tarball = tar::Archive::new(reader);
        let mut entries = 0_usize;

        for entry_result in tarball.entries()? {
            let mut entry = entry_result?;
            let entry_path = entry.path()?.into_owned();

            validate_entry_path(&entry_path)?;
            trace!("unpacking {} from {archive}", entry_path.display());

            entry.unpack_in(destination)?;
            entries += 1;
        }

        if entries == 0 {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(())
    }
}

/// Open `archive` and wrap it in the decoder matching its magic bytes.
fn open_decoded(archive: &Utf8Path) -> Result<Box<dyn Read>, ExtractionError> {
    let mut file = File::open(archive)?;
    let mut prefix = Vec::with_capacity(ZSTD_MAGIC.len());
    (&mut file)
        .take(ZSTD_MAGIC.len() as u64)
        .read_to_end(&mut prefix)?;
    file.rewind()?;

    let reader: Box<dyn Read> = match Compression::detect(&prefix) {
        Compression::Gzip => Box::new(GzDecoder::new(BufReader::new(file))),
        Compression::Zstd => Box::new(zstd::Decoder::new(file)?),
        Compression::None => Box::new(BufReader::new(file)),
    };
    Ok(reader)
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
