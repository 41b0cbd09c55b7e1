//! Capability boundary between the bulk-action core and a Telegram connection.
//!
//! The core never talks to `grammers` directly. It only needs to enumerate
//! dialogs, perform one of three side effects on a dialog, and read the
//! account's newest saved message. Every call reports flood and slow-mode
//! waits as [`ActionError::RateLimited`] so the caller decides how to wait.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a single gateway call can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// Telegram asked us to wait this many seconds before retrying.
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// The target id is malformed or no longer resolves to a dialog.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Any other failure (permissions, network hiccup, server error).
    #[error("{0}")]
    Failed(String),

    /// The underlying connection is gone; nothing else will succeed.
    #[error("Connection lost: {0}")]
    Disconnected(String),
}

impl ActionError {
    /// Returns the wait in seconds if this is a rate-limit signal.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u32> {
        match self {
            Self::RateLimited(seconds) => Some(*seconds),
            _ => None,
        }
    }
}

/// Entity flags exactly as the provider reports them for a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawEntity {
    /// A user account; `bot` and `is_self` come straight from the user flags.
    User { bot: bool, is_self: bool },

    /// A small (legacy) group chat.
    BasicGroup,

    /// A channel; `megagroup` is set for supergroups.
    Channel { megagroup: bool },
}

/// One dialog entry as enumerated from the account's chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDialog {
    /// Bare peer identifier.
    pub id: i64,

    /// Kind flags of the dialog's entity.
    pub entity: RawEntity,

    /// Title for groups and channels.
    pub title: Option<String>,

    /// First name for users and bots.
    pub first_name: Option<String>,

    /// Last name for users.
    pub last_name: Option<String>,
}

impl RawDialog {
    /// Creates a user dialog entry.
    #[must_use]
    pub fn user(id: i64, first_name: &str, last_name: Option<&str>) -> Self {
        Self {
            id,
            entity: RawEntity::User {
                bot: false,
                is_self: false,
            },
            title: None,
            first_name: Some(first_name.to_owned()),
            last_name: last_name.map(str::to_owned),
        }
    }

    /// Creates a bot dialog entry.
    #[must_use]
    pub fn bot(id: i64, first_name: &str) -> Self {
        Self {
            entity: RawEntity::User {
                bot: true,
                is_self: false,
            },
            ..Self::user(id, first_name, None)
        }
    }

    /// Creates the "Saved Messages" dialog entry of the signed-in account.
    #[must_use]
    pub fn own(id: i64, first_name: &str) -> Self {
        Self {
            entity: RawEntity::User {
                bot: false,
                is_self: true,
            },
            ..Self::user(id, first_name, None)
        }
    }

    /// Creates a basic group dialog entry.
    #[must_use]
    pub fn basic_group(id: i64, title: &str) -> Self {
        Self {
            id,
            entity: RawEntity::BasicGroup,
            title: Some(title.to_owned()),
            first_name: None,
            last_name: None,
        }
    }

    /// Creates a channel dialog entry (`megagroup` for supergroups).
    #[must_use]
    pub fn channel(id: i64, title: &str, megagroup: bool) -> Self {
        Self {
            entity: RawEntity::Channel { megagroup },
            ..Self::basic_group(id, title)
        }
    }
}

/// Network capability consumed by the target selector, the bulk runner and
/// the spam loop.
///
/// Implementations must perform exactly one provider call per method call and
/// must never sleep on a flood wait themselves.
#[async_trait]
pub trait DialogGateway: Send + Sync {
    /// Enumerates every dialog of the account, exhausting the provider's iterator.
    async fn list_dialogs(&self) -> Result<Vec<RawDialog>, ActionError>;

    /// Sends a text message to the dialog with the given id.
    async fn send_message(&self, target: i64, text: &str) -> Result<(), ActionError>;

    /// Deletes the dialog (leaves groups and channels, clears private chats).
    async fn delete_dialog(&self, target: i64) -> Result<(), ActionError>;

    /// Blocks the user with the given id.
    async fn block_user(&self, target: i64) -> Result<(), ActionError>;

    /// Returns the text of the newest message in "Saved Messages", if any.
    async fn saved_message(&self) -> Result<Option<String>, ActionError>;
}
