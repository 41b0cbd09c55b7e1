//! Bulk actions over one kind of dialog: broadcast, leave, delete, block.
//!
//! A run is prepared first ([`BulkPlan::prepare`]): targets are enumerated
//! and, for broadcasts, the message is fetched from Saved Messages. Nothing
//! is touched until [`BulkPlan::execute`] is called with the user's
//! confirmation.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::dialog::{KindFilter, TargetSet};
use super::operation::Operation;
use super::runner::{BulkActionRunner, ProgressReporter, RunError, RunSummary};
use super::selector::TargetSelector;
use crate::telegram::{ActionError, DialogGateway};

/// Every bulk action the menu offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkAction {
    /// Send the newest saved message to every private chat.
    BroadcastUsers,
    /// Send the newest saved message to every group.
    BroadcastGroups,
    /// Leave every broadcast channel.
    LeaveChannels,
    /// Leave every group.
    LeaveGroups,
    /// Delete every private chat.
    DeleteUsers,
    /// Delete every bot chat.
    DeleteBots,
    /// Block every bot the account has a chat with.
    BlockBots,
}

/// Side effect applied per target, before any message body is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Broadcast,
    Delete,
    Block,
}

impl BulkAction {
    /// Every bulk action, in menu order.
    pub const ALL: [Self; 7] = [
        Self::BroadcastUsers,
        Self::BroadcastGroups,
        Self::LeaveChannels,
        Self::LeaveGroups,
        Self::DeleteUsers,
        Self::DeleteBots,
        Self::BlockBots,
    ];

    /// Which dialogs the action applies to.
    #[must_use]
    pub const fn filter(self) -> KindFilter {
        match self {
            Self::BroadcastUsers | Self::DeleteUsers => KindFilter::Users,
            Self::BroadcastGroups | Self::LeaveGroups => KindFilter::Groups,
            Self::LeaveChannels => KindFilter::Channels,
            Self::DeleteBots | Self::BlockBots => KindFilter::Bots,
        }
    }

    /// What happens to each target.
    #[must_use]
    pub const fn effect(self) -> Effect {
        match self {
            Self::BroadcastUsers | Self::BroadcastGroups => Effect::Broadcast,
            Self::LeaveChannels | Self::LeaveGroups | Self::DeleteUsers | Self::DeleteBots => {
                Effect::Delete
            }
            Self::BlockBots => Effect::Block,
        }
    }

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BroadcastUsers => "Broadcast to private chats",
            Self::BroadcastGroups => "Broadcast to groups",
            Self::LeaveChannels => "Leave all channels",
            Self::LeaveGroups => "Leave all groups",
            Self::DeleteUsers => "Delete private chats",
            Self::DeleteBots => "Delete bots",
            Self::BlockBots => "Block bots",
        }
    }

    /// Past-tense verb used in per-target progress lines.
    #[must_use]
    pub const fn done_verb(self) -> &'static str {
        match self.effect() {
            Effect::Broadcast => "Sent to",
            Effect::Delete if matches!(self, Self::LeaveChannels | Self::LeaveGroups) => "Left",
            Effect::Delete => "Deleted",
            Effect::Block => "Blocked",
        }
    }

    /// Word the user must type to confirm the action.
    #[must_use]
    pub const fn confirmation_phrase(self) -> &'static str {
        match self.effect() {
            Effect::Broadcast => "SEND",
            Effect::Delete if matches!(self, Self::LeaveChannels | Self::LeaveGroups) => "LEAVE",
            Effect::Delete => "DELETE",
            Effect::Block => "BLOCK",
        }
    }
}

/// How a bulk action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkRun {
    /// The run went through every target.
    Completed(RunSummary),
    /// The user declined; no target was touched.
    Declined,
}

/// A prepared bulk action, ready to be confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPlan {
    pub action: BulkAction,
    pub targets: TargetSet,
    pub operation: Operation,
}

impl BulkPlan {
    /// Enumerates the targets and resolves the message body for broadcasts.
    ///
    /// Fails with [`RunError::NoBroadcastMessage`] before touching anything
    /// if a broadcast has no saved text to send.
    pub async fn prepare<G: DialogGateway + ?Sized>(
        gateway: &G,
        action: BulkAction,
    ) -> Result<Self, RunError> {
        let targets = TargetSelector::new(gateway)
            .select(action.filter())
            .await
            .map_err(RunError::Enumerate)?;

        let operation = match action.effect() {
            Effect::Broadcast => {
                if targets.is_empty() {
                    Operation::SendMessage(String::new())
                } else {
                    Operation::SendMessage(broadcast_message(gateway).await?)
                }
            }
            Effect::Delete => Operation::DeleteDialog,
            Effect::Block => Operation::BlockUser,
        };

        Ok(Self {
            action,
            targets,
            operation,
        })
    }

    /// Checks if there is nothing to act on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The message a broadcast will send.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.operation {
            Operation::SendMessage(text) => Some(text),
            Operation::DeleteDialog | Operation::BlockUser => None,
        }
    }

    /// Runs the plan if `confirmed`; otherwise returns [`BulkRun::Declined`].
    pub async fn execute<G: DialogGateway + ?Sized>(
        &self,
        gateway: &G,
        confirmed: bool,
        per_item_delay: Duration,
        reporter: &dyn ProgressReporter,
    ) -> Result<BulkRun, RunError> {
        if !confirmed {
            info!("{} declined by user", self.action.label());
            return Ok(BulkRun::Declined);
        }

        BulkActionRunner::new(gateway, per_item_delay)
            .run(&self.targets, &self.operation, reporter)
            .await
            .map(BulkRun::Completed)
    }
}

/// Fetches the broadcast body from Saved Messages.
///
/// A flood wait on the read is slept out and the read retried.
pub async fn broadcast_message<G: DialogGateway + ?Sized>(gateway: &G) -> Result<String, RunError> {
    loop {
        match gateway.saved_message().await {
            Ok(Some(text)) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {
                warn!("Saved Messages has no text message to broadcast");
                return Err(RunError::NoBroadcastMessage);
            }
            Err(ActionError::RateLimited(seconds)) => {
                debug!("Saved Messages read rate limited, sleeping {}s", seconds);
                sleep(Duration::from_secs(u64::from(seconds))).await;
            }
            Err(ActionError::Disconnected(reason)) => return Err(RunError::Connection(reason)),
            Err(e) => {
                warn!("Failed to read Saved Messages: {}", e);
                return Err(RunError::SavedMessage(e));
            }
        }
    }
}
