//! Filesystem existence checks for pipeline inputs.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Errors from checking that a path exists.
#[derive(Debug, thiserror::Error)]
pub enum ExistenceError {
    /// Nothing exists at the path.
    #[error("{path} does not exist")]
    NotFound {
        /// The missing path.
        path: Utf8PathBuf,
    },

    /// The path could not be inspected, for example because a parent
    /// directory is not searchable.
    #[error("{path} could not be inspected")]
    Inaccessible {
        /// The path that could not be inspected.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl ExistenceError {
    /// Return the path the check concerned.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::NotFound { path } | Self::Inaccessible { path, .. } => path,
        }
    }
}

/// Confirm that something exists at `path`.
///
/// Only the entry's metadata is inspected; files, directories, and other
/// entries all count as existing. Symlinks are followed, so a dangling link
/// is reported as missing.
///
/// # Errors
///
/// Returns [`ExistenceError::NotFound`] when nothing is at `path`, and
/// [`ExistenceError::Inaccessible`] for any other I/O failure.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use release_preflight::existence::{ExistenceError, check_exists};
///
/// let missing = check_exists(Utf8Path::new("/definitely/not/here.tgz"));
/// assert!(matches!(missing, Err(ExistenceError::NotFound { .. })));
/// ```
pub fn check_exists(path: &Utf8Path) -> Result<(), ExistenceError> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ExistenceError::NotFound {
            path: path.to_owned(),
        }),
        Err(source) => Err(ExistenceError::Inaccessible {
            path: path.to_owned(),
            source,
        }),
    }
}
