//! Single network side effects on one dialog.

use tracing::debug;

use super::dialog::DialogRef;
use crate::telegram::{ActionError, DialogGateway};

/// What to do to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Send a text message.
    SendMessage(String),
    /// Delete the dialog (leaving it for groups and channels).
    DeleteDialog,
    /// Block the user behind the dialog.
    BlockUser,
}

impl Operation {
    /// Performs the underlying call exactly once.
    ///
    /// Rate-limit signals are returned as [`ActionError::RateLimited`];
    /// sleeping and retrying is up to the caller.
    pub async fn attempt<G: DialogGateway + ?Sized>(
        &self,
        gateway: &G,
        target: &DialogRef,
    ) -> Result<(), ActionError> {
        debug!("{} -> {}", self.name(), target.id);
        match self {
            Self::SendMessage(text) => gateway.send_message(target.id, text).await,
            Self::DeleteDialog => gateway.delete_dialog(target.id).await,
            Self::BlockUser => gateway.block_user(target.id).await,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "send_message",
            Self::DeleteDialog => "delete_dialog",
            Self::BlockUser => "block_user",
        }
    }
}
