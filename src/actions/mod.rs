//! Rate-limit-aware actions over the account's dialogs.
//!
//! Target selection, the sequential bulk runner, broadcast/leave/delete/block
//! plans, and the background spam loop all live here. Every network call goes
//! through a [`DialogGateway`](crate::telegram::DialogGateway).

mod bulk;
mod dialog;
mod operation;
mod runner;
mod selector;
pub mod spam;

#[cfg(test)]
pub(crate) mod testing;

pub use bulk::{BulkAction, BulkPlan, BulkRun, Effect, broadcast_message};
pub use dialog::{DialogKind, DialogRef, KindFilter, TargetSet};
pub use operation::Operation;
pub use runner::{
    ActionOutcome, BulkActionRunner, OutcomeStatus, ProgressReporter, RunError, RunSummary,
    SilentReporter,
};
pub use selector::{SelectError, TargetSelector};
pub use spam::{SpamController, SpamEnd, SpamError, SpamJob, SpamPhase, SpamReport, SpamStatus};
