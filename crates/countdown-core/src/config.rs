use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "TimerConfig::default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl TimerConfig {
    fn default_tick_interval() -> u64 { 1000 }

    /// Tick period, never shorter than 1 ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "AlertConfig::default_message")]
    pub message: String,
    #[serde(default = "AlertConfig::default_vibrate")]
    pub vibrate_ms: u64,
    /// Shell command run when a countdown finishes.
    #[serde(default)]
    pub command: Option<String>,
}

impl AlertConfig {
    fn default_message() -> String { "Countdown over!".into() }
    fn default_vibrate() -> u64 { 1500 }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            message: "Countdown over!".into(),
            vibrate_ms: 1500,
            command: None,
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("countdownd")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "parsing config TOML")
    }
}

pub fn socket_path() -> PathBuf {
    // COUNTDOWND_SOCK env var overrides for testing.
    if let Ok(path) = std::env::var("COUNTDOWND_SOCK") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("countdownd")
        .join("countdownd.sock")
}
