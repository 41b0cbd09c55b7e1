//! Saved Telegram accounts and their session files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur while managing saved accounts.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("All fields are required")]
    MissingField,

    #[error("Invalid API ID: {0} (must be a positive integer)")]
    InvalidApiId(String),

    #[error("Account {0} is already saved")]
    Duplicate(String),

    #[error("No saved account with phone {0}")]
    NotFound(String),

    #[error("Failed to write accounts file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to serialize accounts: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// One saved account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Telegram API ID.
    pub api_id: i32,

    /// Telegram API hash.
    pub api_hash: String,

    /// Phone number as typed by the user, including the leading `+`.
    pub phone: String,

    /// Session file stem inside the sessions directory.
    pub session_name: String,

    /// When the account was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Builds an account from raw user input.
    ///
    /// # Errors
    ///
    /// Returns an error if any field is blank or the API ID is not a positive integer.
    pub fn from_input(api_id: &str, api_hash: &str, phone: &str) -> Result<Self, AccountError> {
        let (api_id, api_hash, phone) = (api_id.trim(), api_hash.trim(), phone.trim());
        if api_id.is_empty() || api_hash.is_empty() || phone.is_empty() {
            return Err(AccountError::MissingField);
        }

        let api_id = api_id
            .parse::<i32>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AccountError::InvalidApiId(api_id.to_owned()))?;

        Ok(Self {
            api_id,
            api_hash: api_hash.to_owned(),
            phone: phone.to_owned(),
            session_name: session_name_for(phone),
            added_at: Some(Utc::now()),
        })
    }

    /// Path of this account's session file.
    #[must_use]
    pub fn session_path(&self, sessions_dir: &Path) -> PathBuf {
        sessions_dir.join(format!("{}.session", self.session_name))
    }
}

/// Derives the session name from a phone number (`+7 999 123` -> `session_7999123`).
#[must_use]
pub fn session_name_for(phone: &str) -> String {
    let compact: String = phone
        .chars()
        .filter(|c| *c != '+' && !c.is_whitespace())
        .collect();
    format!("session_{compact}")
}

/// The `accounts.json` registry.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    path: PathBuf,
    accounts: Vec<Account>,
}

impl AccountRegistry {
    /// Loads the registry from a JSON file.
    ///
    /// A missing file is an empty registry. An unreadable or corrupt file is
    /// reported and also treated as empty.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let accounts = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                error!("Failed to parse {}: {}", path.display(), e);
                Vec::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Vec::new()
            }
        };

        info!("Loaded {} saved account(s)", accounts.len());
        Self { path, accounts }
    }

    /// Writes the registry back to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), AccountError> {
        let content = serde_json::to_string_pretty(&self.accounts)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Saved accounts, in insertion order.
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Finds an account by phone number.
    #[must_use]
    pub fn get(&self, phone: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.phone == phone)
    }

    /// Adds an account and persists the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the phone is already saved or the file cannot be written.
    pub fn add(&mut self, account: Account) -> Result<(), AccountError> {
        if self.get(&account.phone).is_some() {
            return Err(AccountError::Duplicate(account.phone));
        }

        self.accounts.push(account);
        self.save()
    }

    /// Removes an account together with its session file and persists the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if no such account exists or the file cannot be written.
    pub fn remove(&mut self, phone: &str, sessions_dir: &Path) -> Result<Account, AccountError> {
        let index = self
            .accounts
            .iter()
            .position(|a| a.phone == phone)
            .ok_or_else(|| AccountError::NotFound(phone.to_owned()))?;

        let account = self.accounts.remove(index);
        let session = account.session_path(sessions_dir);
        match std::fs::remove_file(&session) {
            Ok(()) => info!("Removed session file {}", session.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", session.display(), e),
        }

        self.save()?;
        Ok(account)
    }
}
