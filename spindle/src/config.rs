//! Startup configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! tick_interval_ms = 50
//! enable_effect_commands = true
//! effect_command_token = "!"
//! log_unbridged_events = false
//! entity_names_in_scripts = false
//! ```

use serde::{Deserialize, Serialize};
#[cfg(feature = "tokio")]
use spindle_std::scheduler::IntervalTicker;
use std::{fs, path::Path, time::Duration};
use thiserror::Error;

/// Errors loading a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`Config`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

fn default_tick_interval() -> u64 {
    50
}

fn default_token() -> String {
    "!".to_owned()
}

fn default_true() -> bool {
    true
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Milliseconds per tick for the interval ticker.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Whether chat lines starting with the token run as effects.
    pub enable_effect_commands: bool,

    /// Prefix marking a chat line as an effect command.
    #[serde(default = "default_token")]
    pub effect_command_token: String,

    /// Whether declared events without a native bridge are logged.
    #[serde(default = "default_true")]
    pub log_unbridged_events: bool,

    /// Whether plain entity names and UUIDs parse inside scripts.
    ///
    /// Off by default: they only parse in commands, where the target is
    /// resolved once and used immediately.
    pub entity_names_in_scripts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            enable_effect_commands: false,
            effect_command_token: default_token(),
            log_unbridged_events: true,
            entity_names_in_scripts: false,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        tracing::info!(target: "spindle::startup", path = %path.display(), "loaded config");
        Ok(config)
    }

    /// The period between ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// An interval ticker running at [`tick_interval`](Self::tick_interval).
    #[cfg(feature = "tokio")]
    pub fn ticker(&self) -> IntervalTicker {
        IntervalTicker::new(self.tick_interval())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be greater than zero",
            });
        }
        if self.effect_command_token.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "effect_command_token",
                reason: "must not be blank",
            });
        }
        Ok(())
    }
}
