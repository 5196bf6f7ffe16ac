//! Release archives: extraction, parsing, and validation.
//!
//! - [`extraction`] - Pluggable archive unpacking
//! - [`descriptor`] - `release.MF` and `job.MF` deserialization
//! - [`model`] - The parsed release description
//! - [`reader`] - Turning an archive into a [`Release`]
//! - [`validation`] - Structural rules a release must satisfy

pub mod descriptor;
pub mod extraction;
pub mod model;
pub mod reader;
pub mod validation;

pub use descriptor::ParseError;
pub use extraction::{ExtractionError, ReleaseExtractor, TarballExtractor};
pub use model::{Job, JobProperty, Package, Release};
pub use reader::{ArchiveReader, ReadError};
pub use validation::{Rule, Subject, ValidationOutcome, Violation, Violations, validate};
