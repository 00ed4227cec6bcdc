//! Project configuration for `docserve.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   └── serve      # [serve]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # find_config_file
//! └── mod.rs         # Config (this file)
//! ```
//!
//! The file is optional: without one, defaults apply relative to the current
//! directory. Command-line flags override file values.

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::ServeConfig;

use util::find_config_file;

use crate::cli::{Cli, Commands};
use crate::utils::path::expand_path;
use crate::{debug, warn};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file searched for when `--config` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "docserve.toml";

/// Root configuration structure representing docserve.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file, when one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative paths in the file resolve against (internal use only)
    #[serde(skip)]
    pub base: PathBuf,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl Config {
    /// Load configuration for `cli`, searching upward from the current directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Self::load_in(cli, &cwd)
    }

    /// Load configuration as if `cwd` were the working directory.
    pub fn load_in(cli: &Cli, cwd: &Path) -> Result<Self> {
        let config_path = match &cli.config {
            Some(explicit) => {
                let path = if explicit.is_absolute() {
                    explicit.clone()
                } else {
                    cwd.join(explicit)
                };
                if !path.is_file() {
                    return Err(ConfigError::Io(
                        path,
                        std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                    )
                    .into());
                }
                Some(path)
            }
            None => find_config_file(Path::new(DEFAULT_CONFIG_NAME), cwd),
        };

        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => {
                debug!("config"; "no {} found, using defaults", DEFAULT_CONFIG_NAME);
                Self::default()
            }
        };

        let base = config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
        config.config_path = config_path;
        config.finalize(&base);
        config.apply_command_options(cli, cwd);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::warn_unknown_fields(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn warn_unknown_fields(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        warn!("config"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Resolve every path in the file against `base`.
    fn finalize(&mut self, base: &Path) {
        self.base = base.to_path_buf();
        self.serve.root = expand_path(&self.serve.root, base);
        self.serve.watch = self
            .serve
            .watch
            .iter()
            .map(|dir| expand_path(dir, base))
            .collect();
    }

    /// Apply command-line overrides; their paths are relative to `cwd`.
    fn apply_command_options(&mut self, cli: &Cli, cwd: &Path) {
        if let Some(argv) = cli.build_args().argv() {
            self.serve.build = argv;
        }

        if let Commands::Serve {
            root,
            watch,
            interface,
            port,
            ..
        } = &cli.command
        {
            if let Some(root) = root {
                self.serve.root = expand_path(root, cwd);
            }
            if !watch.is_empty() {
                self.serve.watch = watch.iter().map(|dir| expand_path(dir, cwd)).collect();
            }
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Collect every validation error and report them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.serve.validate(&mut diag);
        diag.into_result()
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse a config string. Panics on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
