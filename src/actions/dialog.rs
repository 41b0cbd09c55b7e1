//! Dialog classification and target sets.

use std::collections::HashSet;
use std::fmt;

use crate::telegram::{RawDialog, RawEntity};

/// Kind of an addressable dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogKind {
    /// Broadcast channel.
    Channel,
    /// Supergroup (a channel with the megagroup flag).
    Megagroup,
    /// Legacy small group.
    BasicGroup,
    /// Private chat with a human user.
    User,
    /// Private chat with a bot.
    Bot,
    /// Built from a raw id typed by the user; the kind is unknown until first use.
    Unresolved,
}

impl DialogKind {
    /// Classifies a provider entity.
    ///
    /// Rules are exclusive and evaluated in order; the account's own dialog
    /// matches none of them and yields `None`.
    #[must_use]
    pub const fn classify(entity: RawEntity) -> Option<Self> {
        match entity {
            RawEntity::Channel { megagroup: false } => Some(Self::Channel),
            RawEntity::Channel { megagroup: true } => Some(Self::Megagroup),
            RawEntity::BasicGroup => Some(Self::BasicGroup),
            RawEntity::User {
                bot: false,
                is_self: false,
            } => Some(Self::User),
            RawEntity::User { bot: true, .. } => Some(Self::Bot),
            RawEntity::User {
                bot: false,
                is_self: true,
            } => None,
        }
    }

    /// Returns true for both group flavours.
    #[must_use]
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Megagroup | Self::BasicGroup)
    }
}

/// Logical dialog kinds the user can filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFilter {
    Channels,
    Groups,
    Users,
    Bots,
}

impl KindFilter {
    /// Every filter, in menu order.
    pub const ALL: [Self; 4] = [Self::Channels, Self::Groups, Self::Users, Self::Bots];

    /// Returns whether a classified dialog belongs to this filter.
    #[must_use]
    pub const fn matches(self, kind: DialogKind) -> bool {
        match self {
            Self::Channels => matches!(kind, DialogKind::Channel),
            Self::Groups => kind.is_group(),
            Self::Users => matches!(kind, DialogKind::User),
            Self::Bots => matches!(kind, DialogKind::Bot),
        }
    }

    /// Human-readable plural name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Channels => "Channels",
            Self::Groups => "Groups",
            Self::Users => "Private chats",
            Self::Bots => "Bots",
        }
    }

    /// Marker shown next to the label in menus and tables.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Channels => "[📢]",
            Self::Groups => "[👥]",
            Self::Users => "[👤]",
            Self::Bots => "[🤖]",
        }
    }
}

/// One addressable dialog, snapshotted from a single enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRef {
    /// Bare peer identifier.
    pub id: i64,

    /// Classified kind.
    pub kind: DialogKind,

    /// Title or user name, with a placeholder for unnamed entities.
    pub display_name: String,
}

impl DialogRef {
    /// Builds a reference from an enumerated dialog, or `None` if it is excluded.
    #[must_use]
    pub fn from_raw(raw: &RawDialog) -> Option<Self> {
        let kind = DialogKind::classify(raw.entity)?;
        Some(Self {
            id: raw.id,
            kind,
            display_name: display_name(raw, kind),
        })
    }

    /// Builds a reference to a dialog known only by its id.
    #[must_use]
    pub fn unresolved(id: i64) -> Self {
        Self {
            id,
            kind: DialogKind::Unresolved,
            display_name: id.to_string(),
        }
    }
}

impl fmt::Display for DialogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == DialogKind::Unresolved {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.display_name, self.id)
        }
    }
}

fn display_name(raw: &RawDialog, kind: DialogKind) -> String {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };

    match kind {
        DialogKind::User => {
            let full = [raw.first_name.as_deref(), raw.last_name.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if full.is_empty() {
                "Unnamed".to_owned()
            } else {
                full
            }
        }
        DialogKind::Bot => non_empty(&raw.first_name).unwrap_or_else(|| "Bot".to_owned()),
        DialogKind::Channel | DialogKind::Megagroup | DialogKind::BasicGroup => {
            non_empty(&raw.title).unwrap_or_else(|| "Untitled".to_owned())
        }
        DialogKind::Unresolved => raw.id.to_string(),
    }
}

/// Ordered sequence of dialogs, deduplicated by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<DialogRef>,
}

impl TargetSet {
    /// Creates a set holding a single target.
    #[must_use]
    pub fn singleton(target: DialogRef) -> Self {
        Self {
            targets: vec![target],
        }
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Checks if there are no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterates targets in enumeration order.
    pub fn iter(&self) -> std::slice::Iter<'_, DialogRef> {
        self.targets.iter()
    }

    /// Returns the target at the given position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DialogRef> {
        self.targets.get(index)
    }
}

impl FromIterator<DialogRef> for TargetSet {
    /// Keeps the first occurrence of every id, preserving order.
    fn from_iter<I: IntoIterator<Item = DialogRef>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let targets = iter
            .into_iter()
            .filter(|target| seen.insert(target.id))
            .collect();
        Self { targets }
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a DialogRef;
    type IntoIter = std::slice::Iter<'a, DialogRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}
