//! release-preflight CLI entrypoint.
//!
//! This binary checks a release archive against a deployment manifest before
//! a deployment proceeds, and manages the stored deployment manifest path.

use camino::Utf8Path;
use clap::Parser;
use release_preflight::cli::{Cli, Command, DeployArgs, DeploymentArgs};
use release_preflight::config::{ConfigError, PreflightConfig, resolve_config_path};
use release_preflight::error::StagedError;
use release_preflight::existence::check_exists;
use release_preflight::output::{format_human, format_json, write_stderr_line};
use release_preflight::pipeline::run_preflight;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Failures that end the process with a non-zero status.
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Preflight(#[from] StagedError),
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the log subscriber; `RUST_LOG` overrides the verbosity flags.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<(), RunError> {
    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = PreflightConfig::load(&config_path)?;

    match &cli.command {
        Command::Deploy(args) => run_deploy(cli, args, &config, stdout, stderr),
        Command::Deployment(args) => run_deployment(args, config, &config_path, stderr),
    }
}

fn run_deploy(
    cli: &Cli,
    args: &DeployArgs,
    config: &PreflightConfig,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<(), RunError> {
    let summary = run_preflight(
        &args.pipeline_args(config),
        args.pipeline_options(cli.quiet, config),
        stderr,
    )?;

    if args.json {
        write_stderr_line(stdout, format_json(&summary));
    } else if !cli.quiet {
        write_stderr_line(stderr, format_human(&summary).trim_end());
    }
    Ok(())
}

fn run_deployment(
    args: &DeploymentArgs,
    mut config: PreflightConfig,
    config_path: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<(), RunError> {
    let Some(manifest) = &args.manifest else {
        match &config.deployment {
            Some(current) => write_stderr_line(stderr, format!("Deployment set to '{current}'")),
            None => write_stderr_line(stderr, "No deployment set"),
        }
        return Ok(());
    };

    if let Err(err) = check_exists(manifest) {
        // Storing a manifest that is not there yet is allowed; warn only.
        write_stderr_line(stderr, format!("Warning: {err}"));
    }
    config.deployment = Some(manifest.clone());
    config.save(config_path)?;
    write_stderr_line(stderr, format!("Deployment set to '{manifest}'"));
    Ok(())
}

fn exit_code_for_run_result(result: Result<(), RunError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(RunError::Preflight(err)) => {
            // The operator message was already written by the pipeline.
            write_stderr_line(stderr, format!("error: {}", err.cause));
            if let Some(violations) = err.cause.violations() {
                for violation in violations {
                    write_stderr_line(stderr, format!("  - {violation}"));
                }
            }
            1
        }
        Err(RunError::Config(err)) => {
            use std::error::Error as _;

            write_stderr_line(stderr, format!("error: {err}"));
            let mut source = err.source();
            while let Some(cause) = source {
                write_stderr_line(stderr, format!("  caused by: {cause}"));
                source = cause.source();
            }
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use release_preflight::error::{PreflightError, Stage};
    use release_preflight::release::validate;
    use release_preflight::release::{Release, Violations};

    fn violations() -> Violations {
        let release = Release {
            name: String::new(),
            version: String::new(),
            commit_hash: None,
            uncommitted_changes: false,
            jobs: Vec::new(),
            packages: Vec::new(),
            extracted_path: Utf8PathBuf::from("/scratch"),
        };
        validate(&release).into_result().expect_err("invalid release")
    }

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(Ok(()), &mut stderr), 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn validation_failure_lists_every_violation() {
        let err = StagedError::new(
            Stage::Validated,
            PreflightError::ValidationFailed(violations()),
        );

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err.into()), &mut stderr);
        assert_eq!(exit_code, 1);

        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(text.contains("release has 2 violation(s)"), "{text}");
        assert!(text.contains("  - release name must not be empty"), "{text}");
        assert!(text.contains("  - release version must not be empty"), "{text}");
    }

    #[test]
    fn config_failure_exits_with_two() {
        let err = ConfigError::NoConfigDirectory;

        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(Err(err.into()), &mut stderr), 2);
        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(text.starts_with("error: could not determine a configuration directory"));
    }

    #[test]
    fn deployment_command_stores_and_reports_manifest() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let config_path = dir.join("config.toml");
        let manifest = dir.join("deploy.yml");
        std::fs::write(&manifest, b"name: demo\n").expect("write manifest");
        let args = DeploymentArgs {
            manifest: Some(manifest.clone()),
        };

        let mut stderr = Vec::new();
        run_deployment(&args, PreflightConfig::default(), &config_path, &mut stderr)
            .expect("store deployment");

        let stored = PreflightConfig::load(&config_path).expect("reload");
        assert_eq!(stored.deployment, Some(manifest.clone()));
        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert_eq!(text, format!("Deployment set to '{manifest}'\n"));
    }

    #[test]
    fn deployment_command_without_value_reports_unset() {
        let mut stderr = Vec::new();
        run_deployment(
            &DeploymentArgs::default(),
            PreflightConfig::default(),
            Utf8Path::new("/unused/config.toml"),
            &mut stderr,
        )
        .expect("show deployment");

        assert_eq!(stderr, b"No deployment set\n");
    }
}
