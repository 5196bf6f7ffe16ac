//! CLI argument definitions for release-preflight.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::PreflightConfig;
use crate::pipeline::{PreflightArgs, PreflightOptions};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Check a release archive before deploying it.
#[derive(Parser, Debug)]
#[command(name = "release-preflight")]
#[command(version, about)]
#[command(long_about = concat!(
    "Check a release archive before deploying it.\n\n",
    "The release is unpacked into a temporary directory, its release.MF and ",
    "job descriptors are parsed, and the result is validated. The temporary ",
    "directory is always removed afterwards.\n\n",
    "The deployment manifest is taken from --deployment or from the ",
    "configuration file (see the `deployment` subcommand).",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Remember a deployment manifest:\n",
    "    $ release-preflight deployment ./manifests/demo.yml\n\n",
    "  Check a release against it:\n",
    "    $ release-preflight deploy ./demo-1.0.0.tgz\n\n",
    "  Check against another manifest and print JSON:\n",
    "    $ release-preflight deploy ./demo-1.0.0.tgz -d ./staging.yml --json",
))]
pub struct Cli {
    /// Configuration file [default: platform-specific].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        alias = "verbosity",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Return the default log filter directive for the requested verbosity.
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check a release archive against the deployment manifest.
    Deploy(DeployArgs),

    /// Show or set the stored deployment manifest.
    Deployment(DeploymentArgs),
}

/// Arguments for the deploy command.
#[derive(Parser, Debug, Clone, Default)]
pub struct DeployArgs {
    /// Path to the release archive.
    #[arg(value_name = "RELEASE")]
    pub release: Option<Utf8PathBuf>,

    /// Deployment manifest for this run [default: from configuration].
    #[arg(short, long, value_name = "FILE")]
    pub deployment: Option<Utf8PathBuf>,

    /// Directory for the temporary workspace [default: system temp dir].
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<Utf8PathBuf>,

    /// Print the summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl DeployArgs {
    /// Build pipeline inputs, falling back to `config` for the deployment.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use release_preflight::cli::DeployArgs;
    /// use release_preflight::config::PreflightConfig;
    ///
    /// let config = PreflightConfig {
    ///     deployment: Some(Utf8PathBuf::from("stored.yml")),
    ///     ..PreflightConfig::default()
    /// };
    /// let args = DeployArgs::default().pipeline_args(&config);
    /// assert_eq!(args.deployment, Some(Utf8PathBuf::from("stored.yml")));
    /// ```
    #[must_use]
    pub fn pipeline_args(&self, config: &PreflightConfig) -> PreflightArgs {
        PreflightArgs {
            release: self.release.clone(),
            deployment: self
                .deployment
                .clone()
                .or_else(|| config.deployment.clone()),
        }
    }

    /// Build pipeline options, falling back to `config` for the scratch root.
    #[must_use]
    pub fn pipeline_options(&self, quiet: bool, config: &PreflightConfig) -> PreflightOptions {
        PreflightOptions {
            // JSON output keeps stderr free of progress noise.
            quiet: quiet || self.json,
            scratch_root: self
                .scratch_dir
                .clone()
                .or_else(|| config.scratch_root.clone()),
        }
    }
}

/// Arguments for the deployment command.
#[derive(Parser, Debug, Clone, Default)]
pub struct DeploymentArgs {
    /// Manifest to store; prints the current one when omitted.
    #[arg(value_name = "FILE")]
    pub manifest: Option<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
