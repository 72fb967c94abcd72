//! Configuration Management
//!
//! Loads playback configuration from TOML. Configuration includes:
//! - Playback (mode, speed factor, base delay between steps)
//! - Layout (spacing, direction, cache TTL and capacity)
//! - Output (colour, JSON frames)

use crate::errors::{ConfigError, Result};
use crate::layout::LayoutOptions;
use crate::sequencer::PlaybackMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "patternflow.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub mode: PlaybackMode,
    /// Multiplier on playback speed (2.0 = twice as fast)
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f64,
    /// Delay between auto-mode steps at speed 1.0
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Auto,
            speed_factor: default_speed_factor(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl PlaybackConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub options: LayoutOptions,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            options: LayoutOptions::default(),
            cache_ttl_ms: default_cache_ttl_ms(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl LayoutConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Colored terminal output
    #[serde(default = "default_true")]
    pub color: bool,
    /// Print frames as JSON lines
    #[serde(default)]
    pub json: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            color: true,
            json: false,
        }
    }
}

fn default_speed_factor() -> f64 {
    1.0
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_cache_ttl_ms() -> u64 {
    5000
}
fn default_cache_capacity() -> usize {
    64
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load from `path`, or from `patternflow.toml` when present, then apply
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(Path::new(p))?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Apply `PATTERNFLOW_MODE`, `PATTERNFLOW_SPEED` and `PATTERNFLOW_DELAY_MS`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("PATTERNFLOW_MODE") {
            match mode.trim().to_lowercase().as_str() {
                "auto" => self.playback.mode = PlaybackMode::Auto,
                "step" | "step-by-step" | "step_by_step" => {
                    self.playback.mode = PlaybackMode::StepByStep
                }
                other => warn!(value = other, "Ignoring invalid PATTERNFLOW_MODE"),
            }
        }
        if let Some(speed) = lookup("PATTERNFLOW_SPEED") {
            match speed.trim().parse::<f64>() {
                Ok(s) => self.playback.speed_factor = s,
                Err(_) => warn!(value = speed.as_str(), "Ignoring invalid PATTERNFLOW_SPEED"),
            }
        }
        if let Some(delay) = lookup("PATTERNFLOW_DELAY_MS") {
            match delay.trim().parse::<u64>() {
                Ok(d) => self.playback.base_delay_ms = d,
                Err(_) => warn!(value = delay.as_str(), "Ignoring invalid PATTERNFLOW_DELAY_MS"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let speed = self.playback.speed_factor;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "playback.speed_factor".to_string(),
                value: speed.to_string(),
            }
            .into());
        }
        if self.layout.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "layout.cache_capacity".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
