//! Preflight pipeline orchestration.
//!
//! A run checks its inputs, unpacks the release into a scratch workspace,
//! parses and validates it, and removes the workspace before returning:
//!
//! ```text
//! ArgsChecked -> ArchiveExists -> ManifestPathSet -> ManifestExists
//!   -> WorkspaceAcquired -> Extracted -> Validated
//! ```
//!
//! The first failing stage ends the run. Its operator message is written to
//! the supplied stderr writer and a [`StagedError`] is returned.

use crate::error::{PreflightError, Result, Stage, StagedError};
use crate::existence::check_exists;
use crate::output::write_stderr_line;
use crate::release::{
    ArchiveReader, ReadError, Release, ReleaseExtractor, TarballExtractor, validate,
};
use crate::workspace::ScratchWorkspace;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use serde::Serialize;
use std::io::Write;

/// Prefix of every scratch workspace directory name.
pub const WORKSPACE_PREFIX: &str = "preflight-deploy";

/// Inputs to one run. Empty paths count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightArgs {
    /// Path to the release archive.
    pub release: Option<Utf8PathBuf>,
    /// Path to the deployment manifest.
    pub deployment: Option<Utf8PathBuf>,
}

impl PreflightArgs {
    fn release(&self) -> Option<&Utf8Path> {
        non_empty(self.release.as_deref())
    }

    fn deployment(&self) -> Option<&Utf8Path> {
        non_empty(self.deployment.as_deref())
    }
}

fn non_empty(path: Option<&Utf8Path>) -> Option<&Utf8Path> {
    path.filter(|path| !path.as_str().is_empty())
}

/// Settings that apply to every run of a [`Preflight`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightOptions {
    /// Suppress progress output.
    pub quiet: bool,
    /// Directory to create scratch workspaces in; the system temporary
    /// directory when unset.
    pub scratch_root: Option<Utf8PathBuf>,
}

/// What a successful run learned about the release.
///
/// Copied out of the parsed release before the workspace is removed, so it
/// holds no paths into the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightSummary {
    /// Release name.
    pub name: String,
    /// Release version.
    pub version: String,
    /// Job names in descriptor order.
    pub jobs: Vec<String>,
    /// Package names in descriptor order.
    pub packages: Vec<String>,
    /// The deployment manifest the release was checked against.
    pub deployment: Utf8PathBuf,
}

impl PreflightSummary {
    fn new(release: &Release, deployment: &Utf8Path) -> Self {
        Self {
            name: release.name.clone(),
            version: release.version.clone(),
            jobs: release.jobs.iter().map(|job| job.name.clone()).collect(),
            packages: release
                .packages
                .iter()
                .map(|package| package.name.clone())
                .collect(),
            deployment: deployment.to_owned(),
        }
    }
}

/// Runs the preflight pipeline with an injected extractor.
///
/// A `Preflight` holds no per-run state, so one instance may serve runs on
/// several threads; each run gets its own workspace.
pub struct Preflight<'a> {
    extractor: &'a dyn ReleaseExtractor,
    options: PreflightOptions,
}

impl<'a> Preflight<'a> {
    /// Create a pipeline that unpacks archives with `extractor`.
    #[must_use]
    pub fn new(extractor: &'a dyn ReleaseExtractor, options: PreflightOptions) -> Self {
        Self { extractor, options }
    }

    /// Run the pipeline once.
    ///
    /// Progress lines are written to `stderr` unless quiet. On failure the
    /// failing stage's operator message is written to `stderr` regardless of
    /// quiet mode. Any workspace acquired by the run has been removed by the
    /// time this returns.
    ///
    /// # Errors
    ///
    /// Returns a [`StagedError`] tagged with the first stage whose check
    /// failed.
    pub fn run(&self, args: &PreflightArgs, stderr: &mut dyn Write) -> Result<PreflightSummary> {
        let result = self.execute(args, stderr);
        if let Err(err) = &result {
            debug!("preflight failed at stage {}: {}", err.stage, err.cause);
            write_stderr_line(
                stderr,
                err.operator_message(args.release(), args.deployment()),
            );
        }
        result
    }

    fn execute(&self, args: &PreflightArgs, stderr: &mut dyn Write) -> Result<PreflightSummary> {
        let archive = require(args.release(), Stage::ArgsChecked, "release")?;
        passed(Stage::ArgsChecked);
        exists(archive, Stage::ArchiveExists)?;

        let deployment = require(args.deployment(), Stage::ManifestPathSet, "deployment")?;
        passed(Stage::ManifestPathSet);
        exists(deployment, Stage::ManifestExists)?;

        let mut workspace =
            ScratchWorkspace::acquire(WORKSPACE_PREFIX, self.options.scratch_root.as_deref())
                .map_err(|err| {
                    StagedError::new(
                        Stage::WorkspaceAcquired,
                        PreflightError::WorkspaceCreationFailed(err),
                    )
                })?;
        passed(Stage::WorkspaceAcquired);

        self.progress(stderr, format!("Extracting release '{archive}'..."));
        let release = ArchiveReader::new(self.extractor)
            .read(archive, workspace.path())
            .map_err(|err| StagedError::new(Stage::Extracted, read_failure(err)))?;
        passed(Stage::Extracted);

        self.progress(
            stderr,
            format!("Validating release '{}/{}'...", release.name, release.version),
        );
        validate(&release).into_result().map_err(|violations| {
            StagedError::new(
                Stage::Validated,
                PreflightError::ValidationFailed(violations),
            )
        })?;
        passed(Stage::Validated);

        let summary = PreflightSummary::new(&release, deployment);
        if let Err(err) = workspace.release() {
            warn!(
                "failed to remove scratch workspace {}: {err}",
                workspace.path()
            );
        }
        Ok(summary)
    }

    fn progress(&self, stderr: &mut dyn Write, message: String) {
        if !self.options.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

/// Run the pipeline once with the default [`TarballExtractor`].
///
/// # Errors
///
/// See [`Preflight::run`].
pub fn run_preflight(
    args: &PreflightArgs,
    options: PreflightOptions,
    stderr: &mut dyn Write,
) -> Result<PreflightSummary> {
    Preflight::new(&TarballExtractor, options).run(args, stderr)
}

fn require<'p>(
    path: Option<&'p Utf8Path>,
    stage: Stage,
    name: &'static str,
) -> Result<&'p Utf8Path> {
    path.ok_or_else(|| StagedError::new(stage, PreflightError::MissingArgument { name }))
}

fn exists(path: &Utf8Path, stage: Stage) -> Result<()> {
    check_exists(path).map_err(|err| StagedError::new(stage, err.into()))?;
    passed(stage);
    Ok(())
}

fn read_failure(err: ReadError) -> PreflightError {
    match err {
        ReadError::Extraction { archive, source } => {
            PreflightError::ExtractionFailed { archive, source }
        }
        ReadError::Parse(err) => PreflightError::MalformedRelease(err),
    }
}

fn passed(stage: Stage) {
    debug!("preflight stage {stage} passed");
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
