//! Reading a release archive into a [`Release`].
//!
//! The reader extracts the outer archive, parses `release.MF`, then extracts
//! every job and package archive it lists into sibling directories of the
//! extraction root:
//!
//! ```text
//! <root>/release.MF
//! <root>/jobs/<job>.tgz          -> <root>/extracted_jobs/<job>/
//! <root>/packages/<package>.tgz  -> <root>/extracted_packages/<package>/
//! ```
//!
//! Either a fully populated [`Release`] is returned or an error; partial
//! results are never exposed.

use super::descriptor::{
    ArtifactRecord, JOB_DESCRIPTOR, ParseError, PackageRecord, RELEASE_DESCRIPTOR,
    parse_job_manifest, parse_release_manifest,
};
use super::extraction::{ExtractionError, ReleaseExtractor};
use super::model::{Job, JobProperty, Package, Release};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

const JOBS_DIR: &str = "jobs";
const PACKAGES_DIR: &str = "packages";
const EXTRACTED_JOBS_DIR: &str = "extracted_jobs";
const EXTRACTED_PACKAGES_DIR: &str = "extracted_packages";
const TEMPLATES_DIR: &str = "templates";
const NESTED_ARCHIVE_EXTENSION: &str = "tgz";

/// Errors from reading a release archive.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The outer archive could not be extracted.
    #[error("failed to extract release archive {archive}")]
    Extraction {
        /// The archive being extracted.
        archive: Utf8PathBuf,
        /// Underlying extractor failure, passed through unchanged.
        #[source]
        source: ExtractionError,
    },

    /// The extracted contents are not a well-formed release.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Reads release archives using an injected extractor.
pub struct ArchiveReader<'a> {
    extractor: &'a dyn ReleaseExtractor,
}

impl<'a> ArchiveReader<'a> {
    /// Create a reader that unpacks archives with `extractor`.
    #[must_use]
    pub fn new(extractor: &'a dyn ReleaseExtractor) -> Self {
        Self { extractor }
    }

    /// Extract `archive` into `root` and parse the result.
    ///
    /// `root` must exist and should be empty; it is owned by the caller and
    /// the returned [`Release`] points into it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Extraction`] if the outer archive cannot be
    /// unpacked, or [`ReadError::Parse`] if the unpacked tree is not a
    /// well-formed release.
    pub fn read(&self, archive: &Utf8Path, root: &Utf8Path) -> Result<Release, ReadError> {
        debug!("extracting release archive {archive} into {root}");
        self.extractor
            .extract(archive, root)
            .map_err(|source| ReadError::Extraction {
                archive: archive.to_owned(),
                source,
            })?;

        Ok(self.parse(root)?)
    }

    fn parse(&self, root: &Utf8Path) -> Result<Release, ParseError> {
        let descriptor = root.join(RELEASE_DESCRIPTOR);
        if !descriptor.is_file() {
            return Err(ParseError::MissingDescriptor { path: descriptor });
        }

        let manifest = parse_release_manifest(&read_text(&descriptor)?, &descriptor)?;
        debug!(
            "release {} {} lists {} job(s) and {} package(s)",
            manifest.name,
            manifest.version,
            manifest.jobs.len(),
            manifest.packages.len()
        );

        let jobs = manifest
            .jobs
            .into_iter()
            .map(|record| self.read_job(root, record))
            .collect::<Result<Vec<_>, _>>()?;
        let packages = manifest
            .packages
            .into_iter()
            .map(|record| self.read_package(root, record))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Release {
            name: manifest.name,
            version: manifest.version,
            commit_hash: manifest.commit_hash,
            uncommitted_changes: manifest.uncommitted_changes,
            jobs,
            packages,
            extracted_path: root.to_owned(),
        })
    }

    fn read_job(&self, root: &Utf8Path, record: ArtifactRecord) -> Result<Job, ParseError> {
        let extracted_path =
            self.unpack_nested(root, JOBS_DIR, EXTRACTED_JOBS_DIR, &record.name)?;

        let descriptor = extracted_path.join(JOB_DESCRIPTOR);
        if !descriptor.is_file() {
            return Err(ParseError::MissingPath { path: descriptor });
        }
        let manifest = parse_job_manifest(&read_text(&descriptor)?, &descriptor)?;

        let templates_dir = extracted_path.join(TEMPLATES_DIR);
        if let Some(missing) = manifest
            .templates
            .keys()
            .map(|source| templates_dir.join(source))
            .find(|path| !path.is_file())
        {
            return Err(ParseError::MissingPath { path: missing });
        }

        Ok(Job {
            name: record.name,
            version: record.version,
            fingerprint: record.fingerprint,
            sha1: record.sha1,
            manifest_name: manifest.name,
            templates: manifest.templates,
            packages: manifest.packages,
            properties: manifest
                .properties
                .into_iter()
                .map(|(key, raw)| {
                    let property = JobProperty {
                        description: raw.description,
                        default: raw.default,
                    };
                    (key, property)
                })
                .collect(),
            extracted_path,
        })
    }

    fn read_package(
        &self,
        root: &Utf8Path,
        package: PackageRecord,
    ) -> Result<Package, ParseError> {
        let PackageRecord {
            record,
            dependencies,
        } = package;
        let extracted_path =
            self.unpack_nested(root, PACKAGES_DIR, EXTRACTED_PACKAGES_DIR, &record.name)?;

        Ok(Package {
            name: record.name,
            version: record.version,
            fingerprint: record.fingerprint,
            sha1: record.sha1,
            dependencies,
            extracted_path,
        })
    }

    /// Extract `<root>/<source_dir>/<name>.tgz` into
    /// `<root>/<target_dir>/<name>` and return the target directory.
    fn unpack_nested(
        &self,
        root: &Utf8Path,
        source_dir: &str,
        target_dir: &str,
        name: &str,
    ) -> Result<Utf8PathBuf, ParseError> {
        let archive = root
            .join(source_dir)
            .join(format!("{name}.{NESTED_ARCHIVE_EXTENSION}"));
        if !archive.is_file() {
            return Err(ParseError::MissingPath { path: archive });
        }

        let destination = root.join(target_dir).join(name);
        std::fs::create_dir_all(&destination).map_err(|err| ParseError::NestedArchive {
            path: archive.clone(),
            source: ExtractionError::Io(err),
        })?;

        debug!("extracting {archive} into {destination}");
        self.extractor
            .extract(&archive, &destination)
            .map_err(|source| ParseError::NestedArchive {
                path: archive,
                source,
            })?;

        Ok(destination)
    }
}

fn read_text(path: &Utf8Path) -> Result<String, ParseError> {
    std::fs::read_to_string(path).map_err(|source| ParseError::Unreadable {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
