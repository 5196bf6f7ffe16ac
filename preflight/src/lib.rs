//! Release preflight library.
//!
//! This crate checks a packaged release before a deployment uses it: it
//! confirms the release archive and deployment manifest exist, unpacks the
//! archive into a scratch workspace, parses the unpacked tree into a
//! [`release::Release`], validates it, and removes the workspace on every
//! path. It is used by the `release-preflight` CLI binary and can be driven
//! programmatically through [`pipeline::Preflight`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Persisted settings and their file location
//! - [`error`] - Stage-tagged pipeline errors
//! - [`existence`] - Input path existence checks
//! - [`output`] - Stderr reporting and summary formatting
//! - [`pipeline`] - Preflight pipeline orchestration
//! - [`release`] - Release extraction, parsing, and validation
//! - [`workspace`] - Self-cleaning scratch directories

pub mod cli;
pub mod config;
pub mod error;
pub mod existence;
pub mod output;
pub mod pipeline;
pub mod release;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
