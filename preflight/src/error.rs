//! Error types for the preflight pipeline.
//!
//! Every pipeline failure is a [`StagedError`]: the [`Stage`] whose guard
//! failed plus the [`PreflightError`] describing why. Operator-facing wording
//! for each stage lives in [`StagedError::operator_message`].

use crate::existence::ExistenceError;
use crate::release::{ExtractionError, ParseError, Violations};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use thiserror::Error;

/// A guarded transition of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// A release archive path was supplied.
    ArgsChecked,
    /// The release archive exists.
    ArchiveExists,
    /// A deployment manifest path is set.
    ManifestPathSet,
    /// The deployment manifest exists.
    ManifestExists,
    /// A scratch workspace was created.
    WorkspaceAcquired,
    /// The archive was extracted and parsed.
    Extracted,
    /// The release passed validation.
    Validated,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Self; 7] = [
        Self::ArgsChecked,
        Self::ArchiveExists,
        Self::ManifestPathSet,
        Self::ManifestExists,
        Self::WorkspaceAcquired,
        Self::Extracted,
        Self::Validated,
    ];

    /// Return the stage's stable identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArgsChecked => "args-checked",
            Self::ArchiveExists => "archive-exists",
            Self::ManifestPathSet => "manifest-path-set",
            Self::ManifestExists => "manifest-exists",
            Self::WorkspaceAcquired => "workspace-acquired",
            Self::Extracted => "extracted",
            Self::Validated => "validated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a pipeline stage failed.
#[derive(Debug, Error)]
pub enum PreflightError {
    /// A required input path was not supplied.
    #[error("missing required argument: {name}")]
    MissingArgument {
        /// Which input is missing.
        name: &'static str,
    },

    /// An input path does not exist.
    #[error("{path} does not exist")]
    NotFound {
        /// The missing path.
        path: Utf8PathBuf,
    },

    /// An input path could not be inspected.
    #[error("{path} could not be inspected")]
    Inaccessible {
        /// The path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The scratch workspace could not be created.
    #[error("failed to create a scratch workspace")]
    WorkspaceCreationFailed(#[source] std::io::Error),

    /// The release archive could not be unpacked.
    #[error("failed to extract {archive}")]
    ExtractionFailed {
        /// The archive.
        archive: Utf8PathBuf,
        /// Extractor failure.
        #[source]
        source: ExtractionError,
    },

    /// The unpacked archive is not a well-formed release.
    #[error("malformed release: {0}")]
    MalformedRelease(#[source] ParseError),

    /// The release broke one or more validation rules.
    #[error(transparent)]
    ValidationFailed(Violations),
}

impl PreflightError {
    /// Return true if the failure is a defect in the supplied release rather
    /// than in the environment or the pipeline.
    #[must_use]
    pub fn is_input_defect(&self) -> bool {
        matches!(self, Self::MalformedRelease(_) | Self::ValidationFailed(_))
    }

    /// Return the violations if validation failed.
    #[must_use]
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::ValidationFailed(violations) => Some(violations),
            _ => None,
        }
    }
}

impl From<ExistenceError> for PreflightError {
    fn from(err: ExistenceError) -> Self {
        match err {
            ExistenceError::NotFound { path } => Self::NotFound { path },
            ExistenceError::Inaccessible { path, source } => Self::Inaccessible { path, source },
        }
    }
}

/// A pipeline failure tagged with the stage it occurred in.
#[derive(Debug, Error)]
#[error("{stage} failed: {cause}")]
pub struct StagedError {
    /// The stage whose guard failed.
    pub stage: Stage,
    /// What went wrong.
    #[source]
    pub cause: PreflightError,
}

impl StagedError {
    /// Tag `cause` with `stage`.
    #[must_use]
    pub fn new(stage: Stage, cause: PreflightError) -> Self {
        Self { stage, cause }
    }

    /// Return the one-line message shown to the operator.
    ///
    /// `archive` and `manifest` are the inputs as the operator supplied them.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::{Utf8Path, Utf8PathBuf};
    /// use release_preflight::error::{PreflightError, Stage, StagedError};
    ///
    /// let err = StagedError::new(
    ///     Stage::ArchiveExists,
    ///     PreflightError::NotFound { path: Utf8PathBuf::from("missing.tgz") },
    /// );
    /// assert_eq!(
    ///     err.operator_message(Some(Utf8Path::new("missing.tgz")), None),
    ///     "Release archive 'missing.tgz' does not exist",
    /// );
    /// ```
    #[must_use]
    pub fn operator_message(
        &self,
        archive: Option<&Utf8Path>,
        manifest: Option<&Utf8Path>,
    ) -> String {
        let archive = archive.map_or_else(String::new, ToString::to_string);
        let manifest = manifest.map_or_else(String::new, ToString::to_string);
        let inaccessible = matches!(self.cause, PreflightError::Inaccessible { .. });
        match self.stage {
            Stage::ArgsChecked => "No release archive provided".to_owned(),
            Stage::ArchiveExists if inaccessible => {
                format!("Release archive '{archive}' could not be inspected")
            }
            Stage::ArchiveExists => format!("Release archive '{archive}' does not exist"),
            Stage::ManifestPathSet => "No deployment set".to_owned(),
            Stage::ManifestExists if inaccessible => {
                format!("Deployment manifest path '{manifest}' could not be inspected")
            }
            Stage::ManifestExists => {
                format!("Deployment manifest path '{manifest}' does not exist")
            }
            Stage::WorkspaceAcquired => "Could not create a temporary directory".to_owned(),
            Stage::Extracted if matches!(self.cause, PreflightError::MalformedRelease(_)) => {
                format!("Release archive '{archive}' is not a valid release archive")
            }
            Stage::Extracted => format!("Release archive '{archive}' could not be extracted"),
            Stage::Validated => format!("Release archive '{archive}' is not a valid release"),
        }
    }
}

/// Result type alias using [`StagedError`].
pub type Result<T> = std::result::Result<T, StagedError>;
