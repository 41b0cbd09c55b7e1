//! Target selection over a fresh dialog enumeration.

use thiserror::Error;
use tracing::debug;

use super::dialog::{DialogRef, KindFilter, TargetSet};
use crate::telegram::{ActionError, DialogGateway};

/// Errors raised while turning user input into a target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("Invalid chat id: '{0}' (expected an integer)")]
    InvalidTarget(String),
}

/// Resolves dialogs from the gateway into target sets.
///
/// Listing, spam target picking and bulk actions all go through
/// [`TargetSelector::select`], so a dialog is classified the same way
/// everywhere.
pub struct TargetSelector<'a, G: ?Sized> {
    gateway: &'a G,
}

impl<'a, G: DialogGateway + ?Sized> TargetSelector<'a, G> {
    /// Creates a selector over the given gateway.
    #[must_use]
    pub const fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// Enumerates all dialogs once and keeps those matching `filter`.
    pub async fn select(&self, filter: KindFilter) -> Result<TargetSet, ActionError> {
        let dialogs = self.gateway.list_dialogs().await?;
        let total = dialogs.len();

        let targets: TargetSet = dialogs
            .iter()
            .filter_map(DialogRef::from_raw)
            .filter(|target| filter.matches(target.kind))
            .collect();

        debug!(
            "Selected {} {} out of {} dialogs",
            targets.len(),
            filter.label().to_lowercase(),
            total
        );
        Ok(targets)
    }

    /// Turns a user-supplied chat id into a target, ignoring surrounding whitespace.
    ///
    /// Existence is not checked here; an unknown id fails on first use.
    pub fn select_by_id(&self, raw: &str) -> Result<DialogRef, SelectError> {
        let raw = raw.trim();
        let target = raw
            .parse::<i64>()
            .map(DialogRef::unresolved)
            .map_err(|_| SelectError::InvalidTarget(raw.to_owned()))?;
        debug!("Selected chat {} by id", target.id);
        Ok(target)
    }
}
