//! Test support shared by the preflight behavioural tests.
//!
//! [`Inputs`] owns a temporary directory holding a release archive, a
//! deployment manifest, and a dedicated scratch root, so tests can assert
//! that runs leave no workspace behind.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use release_preflight::pipeline::{PreflightArgs, PreflightOptions};
use release_preflight::test_utils::{ReleaseFixture, utf8_tempdir};
use tempfile::TempDir;

/// Files for one scenario, removed when dropped.
pub struct Inputs {
    _temp: TempDir,
    /// Root of the temporary directory.
    pub dir: Utf8PathBuf,
    /// Directory runs create their workspaces in.
    pub scratch: Utf8PathBuf,
    /// An existing deployment manifest.
    pub deployment: Utf8PathBuf,
}

impl Inputs {
    /// Create the directory layout with an empty scratch root.
    pub fn new() -> Self {
        let (temp, dir) = utf8_tempdir();
        let scratch = dir.join("scratch");
        std::fs::create_dir(&scratch).expect("create scratch root");
        let deployment = dir.join("deployment.yml");
        std::fs::write(&deployment, b"name: demo-deployment\n").expect("write deployment");
        Self {
            _temp: temp,
            dir,
            scratch,
            deployment,
        }
    }

    /// Write `fixture` as `<dir>/<file_name>` and return its path.
    pub fn write_release(&self, file_name: &str, fixture: &ReleaseFixture) -> Utf8PathBuf {
        let archive = self.dir.join(file_name);
        fixture
            .write_to(archive.as_std_path())
            .expect("write release fixture");
        archive
    }

    /// Pipeline inputs for `release` against the scenario's deployment.
    pub fn args(&self, release: &Utf8Path) -> PreflightArgs {
        PreflightArgs {
            release: Some(release.to_owned()),
            deployment: Some(self.deployment.clone()),
        }
    }

    /// Quiet options that place workspaces under the scratch root.
    pub fn options(&self) -> PreflightOptions {
        PreflightOptions {
            quiet: true,
            scratch_root: Some(self.scratch.clone()),
        }
    }

    /// Return true if no workspace remains under the scratch root.
    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch)
            .expect("read scratch root")
            .next()
            .is_none()
    }
}

impl Default for Inputs {
    fn default() -> Self {
        Self::new()
    }
}
