//! Structural validation of a parsed [`Release`].
//!
//! Validation is a fixed, ordered battery of pure rule functions. Every rule
//! runs on every call and their findings are concatenated, so a single pass
//! reports all defects. An invalid release is data, not an error: callers
//! decide whether violations abort their workflow.

use super::model::{Job, Package, Release};
use std::collections::BTreeSet;
use std::fmt;

/// The entity a [`Violation`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// The release as a whole.
    Release,
    /// A job, by its `release.MF` name.
    Job(String),
    /// A package, by name.
    Package(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => f.write_str("release"),
            Self::Job(name) => write!(f, "job '{name}'"),
            Self::Package(name) => write!(f, "package '{name}'"),
        }
    }
}

/// A rule a release can break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// The release name is empty.
    MissingReleaseName,
    /// The release version is empty.
    MissingReleaseVersion,
    /// A required job or package field is empty.
    EmptyField {
        /// The empty field: `version`, `fingerprint`, or `sha1`.
        field: &'static str,
    },
    /// The name contains characters outside `[A-Za-z0-9._-]`.
    InvalidName,
    /// Another entry of the same kind already uses this name.
    DuplicateName,
    /// `job.MF` declares a different name from `release.MF`.
    ManifestNameMismatch {
        /// Name found in `job.MF`.
        declared: String,
    },
    /// A dependency names a package the release does not contain.
    MissingPackage {
        /// The absent package.
        package: String,
    },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingReleaseName => f.write_str("name must not be empty"),
            Self::MissingReleaseVersion => f.write_str("version must not be empty"),
            Self::EmptyField { field } => write!(f, "{field} must not be empty"),
            Self::InvalidName => {
                f.write_str("name may only contain ASCII letters, digits, '-', '_' and '.'")
            }
            Self::DuplicateName => f.write_str("name is used more than once"),
            Self::ManifestNameMismatch { declared } => {
                write!(f, "job.MF declares a different name '{declared}'")
            }
            Self::MissingPackage { package } => {
                write!(f, "depends on package '{package}', which is not in the release")
            }
        }
    }
}

/// One broken rule and the entity that broke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The offending entity.
    pub subject: Subject,
    /// The rule broken.
    pub rule: Rule,
}

impl Violation {
    fn new(subject: Subject, rule: Rule) -> Self {
        Self { subject, rule }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.rule)
    }
}

/// A non-empty set of violations, usable as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("release has {} violation(s)", .0.len())]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Iterate over the violations in rule order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for violations produced by [`ValidationOutcome`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the violations as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The result of validating a release.
///
/// The release is valid exactly when the violation list is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    violations: Vec<Violation>,
}

impl ValidationOutcome {
    /// Return true if no rule was broken.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Return every violation in rule order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Convert to a `Result`, failing when any rule was broken.
    ///
    /// # Errors
    ///
    /// Returns [`Violations`] if the release broke at least one rule.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(Violations(self.violations))
        }
    }
}

type RuleCheck = fn(&Release) -> Vec<Violation>;

const RULES: &[RuleCheck] = &[
    release_name_present,
    release_version_present,
    job_metadata_present,
    package_metadata_present,
    names_well_formed,
    job_names_unique,
    package_names_unique,
    job_manifest_names_match,
    job_dependencies_resolve,
    package_dependencies_resolve,
];

/// Run every rule against `release` and collect the violations.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use release_preflight::release::{Release, validate};
///
/// let release = Release {
///     name: String::new(),
///     version: "1".to_owned(),
///     commit_hash: None,
///     uncommitted_changes: false,
///     jobs: Vec::new(),
///     packages: Vec::new(),
///     extracted_path: Utf8PathBuf::from("/tmp/release"),
/// };
/// let outcome = validate(&release);
/// assert!(!outcome.is_valid());
/// assert_eq!(outcome.violations()[0].to_string(), "release name must not be empty");
/// ```
#[must_use]
pub fn validate(release: &Release) -> ValidationOutcome {
    ValidationOutcome {
        violations: RULES.iter().flat_map(|rule| rule(release)).collect(),
    }
}

fn release_name_present(release: &Release) -> Vec<Violation> {
    if release.name.trim().is_empty() {
        vec![Violation::new(Subject::Release, Rule::MissingReleaseName)]
    } else {
        Vec::new()
    }
}

fn release_version_present(release: &Release) -> Vec<Violation> {
    if release.version.trim().is_empty() {
        vec![Violation::new(Subject::Release, Rule::MissingReleaseVersion)]
    } else {
        Vec::new()
    }
}

fn empty_fields<'a>(
    subject: &'a Subject,
    fields: [(&'static str, &'a str); 3],
) -> impl Iterator<Item = Violation> + 'a {
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| Violation::new(subject.clone(), Rule::EmptyField { field }))
}

fn job_metadata_present(release: &Release) -> Vec<Violation> {
    release
        .jobs
        .iter()
        .flat_map(|job| {
            let subject = job_subject(job);
            let fields = [
                ("version", job.version.as_str()),
                ("fingerprint", job.fingerprint.as_str()),
                ("sha1", job.sha1.as_str()),
            ];
            empty_fields(&subject, fields).collect::<Vec<_>>()
        })
        .collect()
}

fn package_metadata_present(release: &Release) -> Vec<Violation> {
    release
        .packages
        .iter()
        .flat_map(|package| {
            let subject = package_subject(package);
            let fields = [
                ("version", package.version.as_str()),
                ("fingerprint", package.fingerprint.as_str()),
                ("sha1", package.sha1.as_str()),
            ];
            empty_fields(&subject, fields).collect::<Vec<_>>()
        })
        .collect()
}

fn is_well_formed_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn names_well_formed(release: &Release) -> Vec<Violation> {
    let jobs = release
        .jobs
        .iter()
        .filter(|job| !is_well_formed_name(&job.name))
        .map(job_subject);
    let packages = release
        .packages
        .iter()
        .filter(|package| !is_well_formed_name(&package.name))
        .map(package_subject);
    jobs.chain(packages)
        .map(|subject| Violation::new(subject, Rule::InvalidName))
        .collect()
}

/// Report each name the second time it is seen, and only once.
fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    names
        .filter(|&name| !seen.insert(name) && reported.insert(name))
        .collect()
}

fn job_names_unique(release: &Release) -> Vec<Violation> {
    duplicates(release.jobs.iter().map(|job| job.name.as_str()))
        .into_iter()
        .map(|name| Violation::new(Subject::Job(name.to_owned()), Rule::DuplicateName))
        .collect()
}

fn package_names_unique(release: &Release) -> Vec<Violation> {
    duplicates(release.packages.iter().map(|package| package.name.as_str()))
        .into_iter()
        .map(|name| Violation::new(Subject::Package(name.to_owned()), Rule::DuplicateName))
        .collect()
}

fn job_manifest_names_match(release: &Release) -> Vec<Violation> {
    release
        .jobs
        .iter()
        .filter_map(|job| {
            let declared = job.manifest_name.as_deref()?;
            (declared != job.name).then(|| {
                Violation::new(
                    job_subject(job),
                    Rule::ManifestNameMismatch {
                        declared: declared.to_owned(),
                    },
                )
            })
        })
        .collect()
}

fn job_dependencies_resolve(release: &Release) -> Vec<Violation> {
    release
        .jobs
        .iter()
        .flat_map(|job| {
            missing_packages(release, &job.packages)
                .map(|package| Violation::new(job_subject(job), Rule::MissingPackage { package }))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn package_dependencies_resolve(release: &Release) -> Vec<Violation> {
    release
        .packages
        .iter()
        .flat_map(|package| {
            missing_packages(release, &package.dependencies)
                .map(|missing| {
                    Violation::new(
                        package_subject(package),
                        Rule::MissingPackage { package: missing },
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn missing_packages<'a>(
    release: &'a Release,
    names: &'a [String],
) -> impl Iterator<Item = String> + 'a {
    names
        .iter()
        .filter(|name| release.find_package(name).is_none())
        .cloned()
}

fn job_subject(job: &Job) -> Subject {
    Subject::Job(job.name.clone())
}

fn package_subject(package: &Package) -> Subject {
    Subject::Package(package.name.clone())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
