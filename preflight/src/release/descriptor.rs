//! Deserialization of `release.MF` and `job.MF` descriptors.
//!
//! Both descriptors are YAML. Deserialization is deliberately loose about
//! per-entry metadata (missing versions or fingerprints become empty strings)
//! and strict only about what the reader needs to locate files on disk: the
//! release name and version, and the name of every job and package entry.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeMap;

/// File name of the release descriptor at the archive root.
pub const RELEASE_DESCRIPTOR: &str = "release.MF";

/// File name of the job descriptor inside each job archive.
pub const JOB_DESCRIPTOR: &str = "job.MF";

/// Errors arising while turning unpacked files into a release description.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The archive does not contain a release descriptor.
    #[error("{RELEASE_DESCRIPTOR} not found at {path}; not a recognizable release")]
    MissingDescriptor {
        /// Where the descriptor was expected.
        path: Utf8PathBuf,
    },

    /// A descriptor could not be deserialized.
    #[error("invalid descriptor {path}: {reason}")]
    InvalidDescriptor {
        /// Path to the descriptor.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A required field is absent.
    #[error("missing required field \"{field}\" in {path}")]
    MissingField {
        /// Dotted path to the field, for example `jobs[0].name`.
        field: String,
        /// Descriptor the field was expected in.
        path: Utf8PathBuf,
    },

    /// A field is present but unusable.
    #[error("invalid field \"{field}\" in {path}: {reason}")]
    InvalidField {
        /// Dotted path to the field.
        field: String,
        /// Descriptor containing the field.
        path: Utf8PathBuf,
        /// Why the value was rejected.
        reason: String,
    },

    /// A file or directory the descriptor refers to does not exist.
    #[error("expected path {path} does not exist")]
    MissingPath {
        /// The absent path.
        path: Utf8PathBuf,
    },

    /// A file exists but could not be read.
    #[error("failed to read {path}")]
    Unreadable {
        /// The unreadable path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A nested job or package archive could not be extracted.
    #[error("failed to extract nested archive {path}")]
    NestedArchive {
        /// The nested archive.
        path: Utf8PathBuf,
        /// Underlying extraction failure.
        #[source]
        source: super::extraction::ExtractionError,
    },
}

impl ParseError {
    /// Return the name of the offending field, when the error concerns one.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use release_preflight::release::descriptor::ParseError;
    ///
    /// let err = ParseError::MissingField {
    ///     field: "version".to_owned(),
    ///     path: Utf8PathBuf::from("release.MF"),
    /// };
    /// assert_eq!(err.field(), Some("version"));
    /// ```
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Return the path the error concerns.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::MissingDescriptor { path }
            | Self::InvalidDescriptor { path, .. }
            | Self::MissingField { path, .. }
            | Self::InvalidField { path, .. }
            | Self::MissingPath { path }
            | Self::Unreadable { path, .. }
            | Self::NestedArchive { path, .. } => path,
        }
    }
}

/// Result type alias using [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;

/// The validated top level of `release.MF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseManifest {
    /// Release name.
    pub name: String,
    /// Release version.
    pub version: String,
    /// Commit the release was built from.
    pub commit_hash: Option<String>,
    /// Whether the release was built from a dirty tree.
    pub uncommitted_changes: bool,
    /// Job records.
    pub jobs: Vec<ArtifactRecord>,
    /// Package records.
    pub packages: Vec<PackageRecord>,
}

/// A job or package record in `release.MF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Entry name; also the stem of its archive file.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Content fingerprint.
    pub fingerprint: String,
    /// SHA-1 of the archive.
    pub sha1: String,
}

/// A package record in `release.MF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Common record fields.
    pub record: ArtifactRecord,
    /// Names of packages this package depends on.
    pub dependencies: Vec<String>,
}

/// The contents of a job's `job.MF`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobManifest {
    /// Name declared by the job itself.
    pub name: Option<String>,
    /// Template source to destination.
    pub templates: BTreeMap<String, String>,
    /// Runtime package names.
    pub packages: Vec<String>,
    /// Property definitions.
    pub properties: BTreeMap<String, RawProperty>,
}

/// A property definition as written in `job.MF`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawProperty {
    /// Description text.
    pub description: Option<String>,
    /// Default value.
    pub default: Option<serde_yml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRelease {
    name: Option<String>,
    // Plain scalars keep their source text (`1.10`, not `1.1`) when read as
    // strings.
    version: Option<String>,
    commit_hash: Option<String>,
    uncommitted_changes: bool,
    jobs: Vec<RawRecord>,
    packages: Vec<RawRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRecord {
    name: Option<String>,
    version: Option<String>,
    fingerprint: Option<String>,
    sha1: Option<String>,
    dependencies: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawJobManifest {
    name: Option<String>,
    templates: BTreeMap<String, String>,
    packages: Vec<String>,
    properties: BTreeMap<String, Option<RawProperty>>,
}

/// Parse the text of a `release.MF` located at `path`.
///
/// `path` is used only for error messages.
///
/// # Errors
///
/// Returns [`ParseError::InvalidDescriptor`] for malformed YAML or wrongly
/// typed fields, [`ParseError::MissingField`] when `name`, `version`, or an
/// entry's `name` is absent, and [`ParseError::InvalidField`] when an entry
/// name cannot be used as a file name.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use release_preflight::release::descriptor::parse_release_manifest;
///
/// let yaml = "name: demo\nversion: '1'\npackages:\n- name: libfoo\n";
/// let manifest = parse_release_manifest(yaml, Utf8Path::new("release.MF"))
///     .expect("valid descriptor");
/// assert_eq!(manifest.packages[0].record.name, "libfoo");
/// ```
pub fn parse_release_manifest(text: &str, path: &Utf8Path) -> Result<ReleaseManifest> {
    let raw: RawRelease = deserialize(text, path)?;

    let name = require(raw.name, "name", path)?;
    let version = require(raw.version, "version", path)?;

    let jobs = raw
        .jobs
        .into_iter()
        .enumerate()
        .map(|(index, record)| artifact_record(record, &format!("jobs[{index}]"), path))
        .collect::<Result<Vec<_>>>()?;

    let packages = raw
        .packages
        .into_iter()
        .enumerate()
        .map(|(index, mut record)| {
            let dependencies = std::mem::take(&mut record.dependencies);
            let record = artifact_record(record, &format!("packages[{index}]"), path)?;
            Ok(PackageRecord {
                record,
                dependencies,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ReleaseManifest {
        name,
        version,
        commit_hash: raw.commit_hash,
        uncommitted_changes: raw.uncommitted_changes,
        jobs,
        packages,
    })
}

/// Parse the text of a `job.MF` located at `path`.
///
/// Every field is optional; a property written as a bare key (`foo.bar:`)
/// becomes an empty definition.
///
/// # Errors
///
/// Returns [`ParseError::InvalidDescriptor`] for malformed YAML or wrongly
/// typed fields, and [`ParseError::InvalidField`] when a template source is
/// not a relative path inside the job's `templates/` directory.
pub fn parse_job_manifest(text: &str, path: &Utf8Path) -> Result<JobManifest> {
    let raw: RawJobManifest = deserialize(text, path)?;
    if let Some(source) = raw
        .templates
        .keys()
        .find(|source| !is_contained_path(source))
    {
        return Err(ParseError::InvalidField {
            field: format!("templates.{source}"),
            path: path.to_owned(),
            reason: format!("\"{source}\" is not a path inside templates/"),
        });
    }

    Ok(JobManifest {
        name: raw.name,
        templates: raw.templates,
        packages: raw.packages,
        properties: raw
            .properties
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_default()))
            .collect(),
    })
}

fn deserialize<T>(text: &str, path: &Utf8Path) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    // An empty document deserializes to YAML null; treat it as an empty map.
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yml::from_str(text).map_err(|err| ParseError::InvalidDescriptor {
        path: path.to_owned(),
        reason: err.to_string(),
    })
}

fn require(value: Option<String>, field: &str, path: &Utf8Path) -> Result<String> {
    value.ok_or_else(|| ParseError::MissingField {
        field: field.to_owned(),
        path: path.to_owned(),
    })
}

fn artifact_record(raw: RawRecord, prefix: &str, path: &Utf8Path) -> Result<ArtifactRecord> {
    let field = format!("{prefix}.name");
    let name = require(raw.name, &field, path)?;
    if !is_path_component(&name) {
        return Err(ParseError::InvalidField {
            field,
            path: path.to_owned(),
            reason: format!("\"{name}\" cannot be used as a file name"),
        });
    }

    Ok(ArtifactRecord {
        name,
        version: raw.version.unwrap_or_default(),
        fingerprint: raw.fingerprint.unwrap_or_default(),
        sha1: raw.sha1.unwrap_or_default(),
    })
}

/// Return true if `path` is relative and made only of normal components.
fn is_contained_path(path: &str) -> bool {
    let path = Utf8Path::new(path);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Utf8Component::Normal(_)))
}

/// Return true if `name` names exactly one entry inside a directory.
fn is_path_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
