//! Persisted preflight settings.
//!
//! Settings live in a TOML file. Its location is, in order of precedence:
//! the `--config` flag, the `RELEASE_PREFLIGHT_CONFIG` environment variable,
//! or `config.toml` in the platform configuration directory
//! (`~/.config/release-preflight` on Linux).

use camino::{Utf8Path, Utf8PathBuf};
use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "RELEASE_PREFLIGHT_CONFIG";

/// File name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APPLICATION: &str = "release-preflight";

/// Errors from locating, reading, or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no configuration directory (no home directory).
    #[error("could not determine a configuration directory; pass --config or set {CONFIG_ENV}")]
    NoConfigDirectory,

    /// The configuration path is not valid UTF-8.
    #[error("configuration path {} is not valid UTF-8", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read configuration {path}")]
    Read {
        /// Configuration file.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The file is not valid configuration TOML.
    #[error("invalid configuration {path}")]
    Parse {
        /// Configuration file.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// The file could not be written.
    #[error("failed to write configuration {path}")]
    Write {
        /// Configuration file.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Stored settings.
///
/// # Examples
///
/// ```
/// use release_preflight::config::PreflightConfig;
///
/// let config: PreflightConfig = toml::from_str("deployment = \"/srv/deploy.yml\"")
///     .expect("valid config");
/// assert_eq!(config.deployment.as_deref().map(|p| p.as_str()), Some("/srv/deploy.yml"));
/// assert!(config.scratch_root.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreflightConfig {
    /// Deployment manifest used when none is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Utf8PathBuf>,
    /// Directory for scratch workspaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_root: Option<Utf8PathBuf>,
}

impl PreflightConfig {
    /// Load the configuration at `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file exists but cannot be read,
    /// and [`ConfigError::Parse`] if it is not valid configuration.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no configuration at {path}; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] if the directory or file cannot be
    /// written.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let write_error = |source| ConfigError::Write {
            path: path.to_owned(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(write_error)
    }
}

/// Resolve the configuration file location.
///
/// # Errors
///
/// Returns [`ConfigError::NonUtf8Path`] if the environment variable or the
/// platform directory is not UTF-8, and [`ConfigError::NoConfigDirectory`]
/// if no platform directory exists.
pub fn resolve_config_path(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_owned());
    }

    if let Some(value) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return utf8(PathBuf::from(value));
    }

    let dirs = ProjectDirs::from("", "", APPLICATION).ok_or(ConfigError::NoConfigDirectory)?;
    utf8(dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path).map_err(|err| ConfigError::NonUtf8Path {
        path: err.into_path_buf(),
    })
}
