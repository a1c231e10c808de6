//! Layered settings.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/command_flow/config.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `COMMAND_FLOW_*` prefix

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "command_flow";
const ENV_PREFIX: &str = "COMMAND_FLOW";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// REPL prompt.
    pub prompt: String,
    /// Upper bound on "did you mean" candidates.
    pub max_suggestions: usize,
    /// How many aliases may expand into one another.
    pub max_alias_depth: usize,
    /// Fail on handler results of an unknown shape instead of counting them
    /// as success.
    pub strict_results: bool,
    /// Alias file; defaults to `aliases.toml` next to the global config.
    pub alias_file: Option<PathBuf>,
    /// REPL history; none means history is kept in memory only.
    pub history_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            max_suggestions: 5,
            max_alias_depth: 16,
            strict_results: false,
            alias_file: None,
            history_file: None,
        }
    }
}

impl Settings {
    /// Loads all layers, with `explicit` as an additional config file that
    /// must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_layers(global_config_path(), explicit, environment())
    }

    fn load_layers(
        global: Option<PathBuf>,
        explicit: Option<&Path>,
        env: Environment,
    ) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("prompt", defaults.prompt)?
            .set_default("max_suggestions", defaults.max_suggestions as u64)?
            .set_default("max_alias_depth", defaults.max_alias_depth as u64)?
            .set_default("strict_results", defaults.strict_results)?;

        if let Some(global) = global {
            debug!(path = %global.display(), "global config");
            builder = builder.add_source(File::from(global).required(false));
        }
        if let Some(explicit) = explicit {
            debug!(path = %explicit.display(), "explicit config");
            builder = builder.add_source(File::from(explicit).required(true));
        }
        builder = builder.add_source(env);

        let config = builder.build().context("load settings")?;
        config.try_deserialize().context("invalid settings")
    }

    /// The alias file to use: the configured one, else the default location.
    pub fn alias_file(&self) -> Option<PathBuf> {
        self.alias_file.clone().or_else(default_alias_file)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Get the XDG config directory for command_flow.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

pub fn default_alias_file() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("aliases.toml"))
}
