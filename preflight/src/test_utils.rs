//! Shared test utilities for building release archives on disk.
//!
//! [`ReleaseFixture`] writes a gzip tarball laid out like a real release:
//! `release.MF` at the root, one `jobs/<name>.tgz` per job (each holding a
//! `job.MF`, a `monit` file, and its templates), and one
//! `packages/<name>.tgz` per package.

use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use tempfile::TempDir;

/// Create a temporary directory and return it with its UTF-8 path.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
#[must_use]
pub fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("UTF-8 temp path");
    (temp_dir, path)
}

/// Build an uncompressed tar archive from `(path, contents)` pairs.
///
/// # Errors
///
/// Returns an error if the tar builder rejects an entry.
pub fn tar_bytes(entries: &[(String, Vec<u8>)]) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, contents.as_slice())?;
    }
    builder.into_inner()
}

/// Build a gzip-compressed tar archive from `(path, contents)` pairs.
///
/// # Errors
///
/// Returns an error if the tar builder or gzip encoder fails.
pub fn tgz_bytes(entries: &[(String, Vec<u8>)]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&tar_bytes(entries)?)?;
    encoder.finish()
}

/// A job to be packed into a [`ReleaseFixture`].
#[derive(Debug, Clone)]
pub struct JobFixture {
    name: String,
    manifest_name: Option<String>,
    packages: Vec<String>,
    templates: BTreeMap<String, String>,
    ship_templates: bool,
    ship_descriptor: bool,
    ship_archive: bool,
}

impl JobFixture {
    /// A job with one template and no package dependencies.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut templates = BTreeMap::new();
        templates.insert("ctl.erb".to_owned(), "bin/ctl".to_owned());
        Self {
            name: name.to_owned(),
            manifest_name: Some(name.to_owned()),
            packages: Vec::new(),
            templates,
            ship_templates: true,
            ship_descriptor: true,
            ship_archive: true,
        }
    }

    /// Declare runtime package dependencies.
    #[must_use]
    pub fn depends_on(mut self, packages: &[&str]) -> Self {
        self.packages = packages.iter().map(|&package| package.to_owned()).collect();
        self
    }

    /// Use a different name inside `job.MF`.
    #[must_use]
    pub fn declared_as(mut self, name: &str) -> Self {
        self.manifest_name = Some(name.to_owned());
        self
    }

    /// Add a template mapping from `source` to `destination`.
    #[must_use]
    pub fn with_template(mut self, source: &str, destination: &str) -> Self {
        self.templates
            .insert(source.to_owned(), destination.to_owned());
        self
    }

    /// Leave `job.MF` out of the job archive.
    #[must_use]
    pub fn without_descriptor(mut self) -> Self {
        self.ship_descriptor = false;
        self
    }

    /// List templates in `job.MF` without shipping the files.
    #[must_use]
    pub fn without_template_files(mut self) -> Self {
        self.ship_templates = false;
        self
    }

    /// Reference the job from `release.MF` without shipping its archive.
    #[must_use]
    pub fn without_archive(mut self) -> Self {
        self.ship_archive = false;
        self
    }

    fn archive(&self) -> io::Result<Vec<u8>> {
        let manifest = JobManifestYaml {
            name: self.manifest_name.as_deref(),
            templates: &self.templates,
            packages: &self.packages,
        };
        let mut entries = vec![("monit".to_owned(), Vec::new())];
        if self.ship_descriptor {
            entries.push(("job.MF".to_owned(), to_yaml(&manifest)?));
        }
        if self.ship_templates {
            entries.extend(
                self.templates
                    .keys()
                    .map(|source| (format!("templates/{source}"), b"<%= p('x') %>".to_vec())),
            );
        }
        tgz_bytes(&entries)
    }
}

/// A package to be packed into a [`ReleaseFixture`].
#[derive(Debug, Clone)]
pub struct PackageFixture {
    name: String,
    dependencies: Vec<String>,
    ship_archive: bool,
}

impl PackageFixture {
    /// A package with no dependencies.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            dependencies: Vec::new(),
            ship_archive: true,
        }
    }

    /// Declare compile-time dependencies on other packages.
    #[must_use]
    pub fn depends_on(mut self, packages: &[&str]) -> Self {
        self.dependencies = packages.iter().map(|&package| package.to_owned()).collect();
        self
    }

    /// Reference the package from `release.MF` without shipping its archive.
    #[must_use]
    pub fn without_archive(mut self) -> Self {
        self.ship_archive = false;
        self
    }

    fn archive(&self) -> io::Result<Vec<u8>> {
        tgz_bytes(&[("packaging".to_owned(), b"set -e\n".to_vec())])
    }
}

/// Builder for a complete release archive.
///
/// # Examples
///
/// ```
/// use release_preflight::test_utils::{ReleaseFixture, utf8_tempdir};
///
/// let (_temp, dir) = utf8_tempdir();
/// let archive = dir.join("release.tgz");
/// ReleaseFixture::valid().write_to(archive.as_std_path()).expect("write fixture");
/// assert!(archive.is_file());
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseFixture {
    name: Option<String>,
    version: Option<String>,
    jobs: Vec<JobFixture>,
    packages: Vec<PackageFixture>,
    ship_descriptor: bool,
}

impl ReleaseFixture {
    /// An empty release with the given name and version.
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            version: Some(version.to_owned()),
            jobs: Vec::new(),
            packages: Vec::new(),
            ship_descriptor: true,
        }
    }

    /// A valid release: job `worker` depending on package `libfoo`.
    #[must_use]
    pub fn valid() -> Self {
        Self::new("demo", "1.0.0")
            .with_job(JobFixture::new("worker").depends_on(&["libfoo"]))
            .with_package(PackageFixture::new("libfoo"))
    }

    /// Omit `name` from `release.MF`.
    #[must_use]
    pub fn without_name(mut self) -> Self {
        self.name = None;
        self
    }

    /// Omit `version` from `release.MF`.
    #[must_use]
    pub fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    /// Leave `release.MF` out of the archive entirely.
    #[must_use]
    pub fn without_descriptor(mut self) -> Self {
        self.ship_descriptor = false;
        self
    }

    /// Add a job.
    #[must_use]
    pub fn with_job(mut self, job: JobFixture) -> Self {
        self.jobs.push(job);
        self
    }

    /// Add a package.
    #[must_use]
    pub fn with_package(mut self, package: PackageFixture) -> Self {
        self.packages.push(package);
        self
    }

    /// Return the archive entries as `(path, contents)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested archive cannot be built.
    pub fn entries(&self) -> io::Result<Vec<(String, Vec<u8>)>> {
        let mut entries = Vec::new();
        if self.ship_descriptor {
            entries.push(("release.MF".to_owned(), to_yaml(&self.descriptor())?));
        }
        for job in self.jobs.iter().filter(|job| job.ship_archive) {
            entries.push((format!("jobs/{}.tgz", job.name), job.archive()?));
        }
        for package in self.packages.iter().filter(|package| package.ship_archive) {
            entries.push((format!("packages/{}.tgz", package.name), package.archive()?));
        }
        Ok(entries)
    }

    /// Write the release as a gzip tarball at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be built or written.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, tgz_bytes(&self.entries()?)?)
    }

    fn descriptor(&self) -> ReleaseYaml<'_> {
        ReleaseYaml {
            name: self.name.as_deref(),
            version: self.version.as_deref(),
            commit_hash: "abc1234",
            uncommitted_changes: false,
            jobs: self
                .jobs
                .iter()
                .map(|job| RecordYaml::for_name(&job.name, &[]))
                .collect(),
            packages: self
                .packages
                .iter()
                .map(|package| RecordYaml::for_name(&package.name, &package.dependencies))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ReleaseYaml<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    commit_hash: &'a str,
    uncommitted_changes: bool,
    jobs: Vec<RecordYaml<'a>>,
    packages: Vec<RecordYaml<'a>>,
}

#[derive(Serialize)]
struct RecordYaml<'a> {
    name: &'a str,
    version: &'static str,
    fingerprint: String,
    sha1: String,
    #[serde(skip_serializing_if = "no_dependencies")]
    dependencies: &'a [String],
}

impl<'a> RecordYaml<'a> {
    fn for_name(name: &'a str, dependencies: &'a [String]) -> Self {
        Self {
            name,
            version: "1",
            fingerprint: format!("fp-{name}"),
            sha1: format!("sha1-{name}"),
            dependencies,
        }
    }
}

fn no_dependencies(dependencies: &&[String]) -> bool {
    dependencies.is_empty()
}

#[derive(Serialize)]
struct JobManifestYaml<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    templates: &'a BTreeMap<String, String>,
    packages: &'a [String],
}

fn to_yaml<T: Serialize>(value: &T) -> io::Result<Vec<u8>> {
    serde_yml::to_string(value)
        .map(String::into_bytes)
        .map_err(io::Error::other)
}
