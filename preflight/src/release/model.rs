//! Structured description of an unpacked release.
//!
//! A [`Release`] is produced once per pipeline run by the
//! [`ArchiveReader`](super::reader::ArchiveReader) and is read-only afterwards.
//! Parsing is permissive: a release may reference packages it does not ship,
//! carry empty fingerprints, or repeat names. Those defects are reported by
//! [`validate`](super::validation::validate), not here.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;

/// A parsed release archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// Release name from `release.MF`.
    pub name: String,
    /// Release version from `release.MF`.
    pub version: String,
    /// Commit the release was built from, when recorded.
    pub commit_hash: Option<String>,
    /// Whether the release was built from a dirty working tree.
    pub uncommitted_changes: bool,
    /// Jobs in descriptor order.
    pub jobs: Vec<Job>,
    /// Packages in descriptor order.
    pub packages: Vec<Package>,
    /// Directory the archive was extracted into.
    pub extracted_path: Utf8PathBuf,
}

impl Release {
    /// Find a job by name.
    ///
    /// Returns the first match when names are duplicated.
    #[must_use]
    pub fn find_job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Find a package by name.
    ///
    /// Returns the first match when names are duplicated.
    #[must_use]
    pub fn find_package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|package| package.name == name)
    }

    /// Return the extraction root.
    #[must_use]
    pub fn extracted_path(&self) -> &Utf8Path {
        &self.extracted_path
    }
}

/// A job entry, combining its `release.MF` record with its own `job.MF`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Name as listed in `release.MF`.
    pub name: String,
    /// Job version.
    pub version: String,
    /// Content fingerprint.
    pub fingerprint: String,
    /// SHA-1 of the job archive.
    pub sha1: String,
    /// Name declared inside `job.MF`, if any.
    pub manifest_name: Option<String>,
    /// Template source to rendered destination.
    pub templates: BTreeMap<String, String>,
    /// Packages the job needs at runtime.
    pub packages: Vec<String>,
    /// Property definitions keyed by dotted property name.
    pub properties: BTreeMap<String, JobProperty>,
    /// Directory the job archive was extracted into.
    pub extracted_path: Utf8PathBuf,
}

/// A property declared by a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobProperty {
    /// Human-readable description.
    pub description: Option<String>,
    /// Default value, kept as raw YAML.
    pub default: Option<serde_yml::Value>,
}

/// A package entry from `release.MF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Content fingerprint.
    pub fingerprint: String,
    /// SHA-1 of the package archive.
    pub sha1: String,
    /// Names of packages this one is compiled against.
    pub dependencies: Vec<String>,
    /// Directory the package archive was extracted into.
    pub extracted_path: Utf8PathBuf,
}
