//! Configuration module.
//!
//! Saved accounts (`accounts.json`), per-account connection settings and
//! the pacing settings read from the environment.

mod accounts;
mod settings;

pub use accounts::{Account, AccountError, AccountRegistry, session_name_for};
pub use settings::{ConfigError, RunSettings, TelegramConfig};
