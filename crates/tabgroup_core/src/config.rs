//! Core configuration loaded from TOML.
//!
//! # Responsibility
//! - Define tunables shared by the tabs view and logging bootstrap.
//! - Load them from an optional `tabgroup.toml`.
//!
//! # Invariants
//! - A missing file yields defaults; a malformed file is an error.
//! - Every field has a default, so partial files are valid.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "tabgroup.toml";
pub const DEFAULT_STATE_KEY: &str = "tabs-tree.state";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Workspace slot the forest is persisted under.
    pub state_key: String,
    /// Start in sort mode instead of grouping mode.
    pub sort_mode: bool,
    /// Reveal the active tab's node whenever the host reports a change.
    pub reveal_on_change: bool,
    /// Joins path segments in duplicate-name descriptions.
    pub label_separator: String,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            state_key: DEFAULT_STATE_KEY.to_string(),
            sort_mode: false,
            reveal_on_change: true,
            label_separator: std::path::MAIN_SEPARATOR.to_string(),
            log_level: crate::logging::default_log_level().to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl CoreConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("event=config_load module=config status=skip reason=not_found");
            return Ok(CoreConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = CoreConfig::from_toml_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "event=config_load module=config status=ok sort_mode={} reveal_on_change={}",
        config.sort_mode,
        config.reveal_on_change
    );
    Ok(config)
}

/// Loads `tabgroup.toml` from `dir`.
pub fn load_config_from_dir(dir: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    load_config(dir.as_ref().join(CONFIG_FILE_NAME))
}
