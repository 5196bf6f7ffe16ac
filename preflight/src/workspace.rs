//! Scratch workspaces for a single pipeline run.
//!
//! A [`ScratchWorkspace`] is a uniquely named temporary directory that is
//! removed when the guard is released or dropped, whichever comes first.
//! Removal may also be requested from elsewhere (for example a cancellation
//! path) through a detached [`ReleaseHandle`].

use camino::{FromPathBufError, Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::io;
use tempfile::TempDir;

/// Guard owning a temporary directory.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: Option<TempDir>,
    path: Utf8PathBuf,
}

impl ScratchWorkspace {
    /// Create a uniquely named directory whose name starts with `prefix`.
    ///
    /// The directory is created under `root`, or under the system temporary
    /// directory when `root` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or its path is not
    /// valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_preflight::workspace::ScratchWorkspace;
    ///
    /// let workspace = ScratchWorkspace::acquire("preflight-", None).expect("temp dir");
    /// let path = workspace.path().to_owned();
    /// assert!(path.is_dir());
    /// drop(workspace);
    /// assert!(!path.exists());
    /// ```
    pub fn acquire(prefix: &str, root: Option<&Utf8Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf())
            .map_err(FromPathBufError::into_io_error)?;

        debug!("acquired scratch workspace {path}");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Return the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return true once the workspace has been released through this guard.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Return a handle that can remove the workspace independently of the
    /// guard.
    #[must_use]
    pub fn release_handle(&self) -> ReleaseHandle {
        ReleaseHandle {
            path: self.path.clone(),
        }
    }

    /// Recursively remove the workspace.
    ///
    /// Calling this more than once, or after a [`ReleaseHandle`] removed the
    /// directory, succeeds without doing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed. The
    /// guard still counts as released afterwards.
    pub fn release(&mut self) -> io::Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        debug!("releasing scratch workspace {}", self.path);
        ignore_not_found(dir.close())
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("failed to remove scratch workspace {}: {err}", self.path);
        }
    }
}

/// Detached handle that removes a [`ScratchWorkspace`]'s directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHandle {
    path: Utf8PathBuf,
}

impl ReleaseHandle {
    /// Return the directory this handle removes.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Recursively remove the directory; an already absent directory is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn release(&self) -> io::Result<()> {
        ignore_not_found(std::fs::remove_dir_all(&self.path))
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
