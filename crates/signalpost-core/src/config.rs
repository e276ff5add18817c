//! SignalPost configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPostConfig {
    /// Telegram user id of the single administrator.
    #[serde(default)]
    pub admin_id: i64,
    /// Chat id of the subscriber channel broadcasts go to.
    #[serde(default)]
    pub channel_id: i64,
    /// Monthly subscription price, whole currency units.
    #[serde(default = "default_price")]
    pub subscription_price: u32,
    /// Payment key shown in the welcome message.
    #[serde(default)]
    pub payment_key: String,
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub calendar: CalendarSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

fn default_price() -> u32 {
    30
}

impl Default for SignalPostConfig {
    fn default() -> Self {
        Self {
            admin_id: 0,
            channel_id: 0,
            subscription_price: default_price(),
            payment_key: String::new(),
            telegram: TelegramSettings::default(),
            calendar: CalendarSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl SignalPostConfig {
    /// Load config from the default path (~/.signalpost/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::SignalPostError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::SignalPostError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::SignalPostError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the SignalPost home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".signalpost")
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    #[serde(default)]
    pub bot_token: String,
    /// Seconds between long-poll rounds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Holiday calendar settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// Public holidays as YYYY-MM-DD dates. Refresh yearly; dates outside the
    /// configured years degrade the gate to weekday-only filtering.
    #[serde(default)]
    pub holidays: Vec<chrono::NaiveDate>,
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "~/.signalpost/signalpost.db".into()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}
