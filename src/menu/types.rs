//! Main menu entries.

use std::fmt;

use crate::actions::{BulkAction, KindFilter};

/// Available main menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Show a numbered table of one kind of dialog.
    ListDialogs(KindFilter),

    /// Run a bulk action over one kind of dialog.
    Bulk(BulkAction),

    /// Start the background spam loop.
    StartSpam,

    /// Stop the background spam loop.
    StopSpam,

    /// Return to the account manager.
    SwitchAccount,

    /// Quit the program.
    Exit,
}

/// What the session loop should do after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    SwitchAccount,
    Exit,
}

impl MenuAction {
    /// Returns all entries in menu order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut actions: Vec<Self> = KindFilter::ALL.into_iter().map(Self::ListDialogs).collect();
        actions.extend([
            Self::Bulk(BulkAction::BroadcastUsers),
            Self::Bulk(BulkAction::BroadcastGroups),
            Self::StartSpam,
            Self::StopSpam,
            Self::Bulk(BulkAction::LeaveChannels),
            Self::Bulk(BulkAction::LeaveGroups),
            Self::Bulk(BulkAction::DeleteUsers),
            Self::Bulk(BulkAction::DeleteBots),
            Self::Bulk(BulkAction::BlockBots),
            Self::SwitchAccount,
            Self::Exit,
        ]);
        actions
    }

    /// Returns the menu label.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::ListDialogs(filter) => format!("{} List {}", filter.icon(), filter.label().to_lowercase()),
            Self::Bulk(action) => format!("{} {}", bulk_icon(action), action.label()),
            Self::StartSpam => "[▶] Start spam".to_owned(),
            Self::StopSpam => "[■] Stop spam".to_owned(),
            Self::SwitchAccount => "[🔙] Switch account".to_owned(),
            Self::Exit => "[🚪] Exit".to_owned(),
        }
    }

    /// Short name shown in the header while the action runs.
    #[must_use]
    pub fn title(self) -> String {
        match self {
            Self::ListDialogs(filter) => filter.label().to_owned(),
            Self::Bulk(action) => action.label().to_owned(),
            Self::StartSpam => "Start spam".to_owned(),
            Self::StopSpam => "Stop spam".to_owned(),
            Self::SwitchAccount => "Switch account".to_owned(),
            Self::Exit => "Exit".to_owned(),
        }
    }
}

const fn bulk_icon(action: BulkAction) -> &'static str {
    match action {
        BulkAction::BroadcastUsers | BulkAction::BroadcastGroups => "[📨]",
        BulkAction::LeaveChannels | BulkAction::LeaveGroups => "[🚪]",
        BulkAction::DeleteUsers | BulkAction::DeleteBots => "[🗑]",
        BulkAction::BlockBots => "[⛔]",
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
