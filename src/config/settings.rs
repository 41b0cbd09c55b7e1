//! Run settings and per-account Telegram configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::accounts::Account;

/// Telegram API configuration for one connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Phone number used for sign-in.
    pub phone: String,

    /// Path to the session file.
    pub session_path: PathBuf,
}

impl TelegramConfig {
    /// Builds the connection configuration for a saved account.
    #[must_use]
    pub fn for_account(account: &Account, sessions_dir: &Path) -> Self {
        Self {
            api_id: account.api_id,
            api_hash: account.api_hash.clone(),
            phone: account.phone.clone(),
            session_path: account.session_path(sessions_dir),
        }
    }
}

/// Pacing settings for bulk actions and the spam loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Pause after each successful bulk item, in seconds.
    #[serde(default = "default_item_delay")]
    pub item_delay_secs: f64,

    /// Delay suggested when starting a spam loop, in seconds.
    #[serde(default = "default_spam_delay")]
    pub spam_delay_secs: f64,

    /// Spam delays below this ask for an extra confirmation.
    #[serde(default = "default_risky_delay")]
    pub risky_delay_secs: f64,
}

const fn default_item_delay() -> f64 {
    1.0
}

const fn default_spam_delay() -> f64 {
    1.0
}

const fn default_risky_delay() -> f64 {
    0.5
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            item_delay_secs: default_item_delay(),
            spam_delay_secs: default_spam_delay(),
            risky_delay_secs: default_risky_delay(),
        }
    }
}

impl RunSettings {
    /// Reads settings from `TELEGA_ITEM_DELAY`, `TELEGA_SPAM_DELAY` and
    /// `TELEGA_RISKY_DELAY`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but is not a non-negative number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            item_delay_secs: env_secs("TELEGA_ITEM_DELAY", default_item_delay())?,
            spam_delay_secs: env_secs("TELEGA_SPAM_DELAY", default_spam_delay())?,
            risky_delay_secs: env_secs("TELEGA_RISKY_DELAY", default_risky_delay())?,
        })
    }

    /// Same as [`Self::from_env`], falling back to defaults on invalid values.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            warn!("{}; using default run settings", e);
            Self::default()
        })
    }

    /// Bulk pacing as a duration.
    #[must_use]
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs_f64(self.item_delay_secs)
    }

    /// Checks if a spam delay needs the extra confirmation.
    #[must_use]
    pub fn is_risky(&self, delay_secs: f64) -> bool {
        delay_secs < self.risky_delay_secs
    }
}

fn env_secs(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    std::env::var(name).map_or(Ok(default), |raw| parse_secs(name, &raw))
}

fn parse_secs(name: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .ok_or_else(|| ConfigError::InvalidSeconds {
            name,
            value: raw.to_owned(),
        })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} (must be a non-negative number of seconds)")]
    InvalidSeconds { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RunSettings::default();
        assert!((settings.item_delay_secs - 1.0).abs() < f64::EPSILON);
        assert_eq!(settings.item_delay(), Duration::from_secs(1));
        assert!(settings.is_risky(0.2));
        assert!(!settings.is_risky(0.5));
    }

    #[test]
    fn test_parse_secs() {
        assert!((parse_secs("X", " 0.25 ").unwrap() - 0.25).abs() < f64::EPSILON);
        assert!(parse_secs("X", "0").is_ok());
        assert!(parse_secs("X", "-1").is_err());
        assert!(parse_secs("X", "soon").is_err());
        assert!(parse_secs("X", "inf").is_err());
    }

    #[test]
    fn test_telegram_config_for_account() {
        let account = Account::from_input("12345", "abc123", "+1 555").unwrap();
        let config = TelegramConfig::for_account(&account, Path::new("sessions"));
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.phone, "+1 555");
        assert_eq!(
            config.session_path,
            PathBuf::from("sessions/session_1555.session")
        );
    }
}
