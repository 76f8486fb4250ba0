//! Configuration loading and management
//!
//! Handles parsing of `questlog.toml` in the data directory.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::points::Priority;

/// Name of the config file inside the data directory
pub const CONFIG_FILE: &str = "questlog.toml";

const MAX_PAGE_SIZE: usize = 100;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// User identity configuration
    #[serde(default)]
    pub user: UserConfig,

    /// Streak configuration
    #[serde(default)]
    pub streaks: StreaksConfig,

    /// Task configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// User-related configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Identity used when no flag, env var or persisted user is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Streak configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreaksConfig {
    /// Fixed UTC offset used to turn completion instants into calendar dates
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl Default for StreaksConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

impl StreaksConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Tasks per page for `ql task list`
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Priority for new tasks created without one
    #[serde(default = "default_task_priority")]
    pub default_priority: String,
}

fn default_page_size() -> usize {
    10
}

fn default_task_priority() -> String {
    Priority::Medium.as_str().to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_priority: default_task_priority(),
        }
    }
}

impl TasksConfig {
    pub fn default_priority(&self) -> Priority {
        Priority::parse_or_default(&self.default_priority)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "tasks.page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if Priority::parse(&self.default_priority).is_none() {
            return Err(Error::InvalidConfig(format!(
                "tasks.default_priority: unknown priority '{}' (expected LOW|MEDIUM|HIGH|URGENT)",
                self.default_priority
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `questlog.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a data directory.
    ///
    /// A missing file means defaults; a file that fails to parse or validate
    /// is an error.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let config_path = config_path(data_dir);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load(&config_path).map_err(|err| match err {
            Error::TomlParse(parse) => {
                Error::InvalidConfig(format!("{}: {parse}", config_path.display()))
            }
            other => other,
        })
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.streaks.offset()?;
        self.tasks.validate()?;
        if let Some(user) = self.user.default.as_deref() {
            if user.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "user.default cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Parse a fixed offset such as `+07:00` or `-0530`; `Z` and `UTC` mean zero.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    trimmed.parse::<FixedOffset>().map_err(|_| {
        Error::InvalidConfig(format!(
            "streaks.utc_offset: invalid offset '{trimmed}' (expected e.g. +00:00, -05:30, Z)"
        ))
    })
}
