//! Sequential bulk-action runner.
//!
//! The runner walks a [`TargetSet`] strictly in order:
//! 1. Attempt the operation on the target
//! 2. On a rate-limit signal → sleep exactly the requested time, retry the same target
//! 3. On any other failure → record it, move on
//! 4. On success → record it, sleep the pacing delay, move on
//!
//! Only a lost connection aborts the run; per-target failures never do.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::dialog::{DialogRef, TargetSet};
use super::operation::Operation;
use crate::telegram::{ActionError, DialogGateway};

/// Errors that abort a whole run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("No text message in Saved Messages to broadcast")]
    NoBroadcastMessage,

    #[error("Failed to read Saved Messages: {0}")]
    SavedMessage(ActionError),

    #[error("Failed to enumerate dialogs: {0}")]
    Enumerate(ActionError),

    #[error("Connection lost: {0}")]
    Connection(String),
}

/// Result of one attempt on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    /// Telegram asked to wait; the same target will be retried.
    RateLimited(u32),
    Failed(String),
}

/// Progress event emitted after every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub target: DialogRef,
    pub status: OutcomeStatus,
    /// Attempt number on this target, starting at 1.
    pub attempt: u32,
    /// 1-based position of the target in the run (or the send number for spam).
    pub position: usize,
    /// Number of targets in the run; `None` for unbounded loops.
    pub total: Option<usize>,
}

/// Aggregated counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Wall time of the run in seconds.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Receives progress events as they happen.
pub trait ProgressReporter: Send + Sync {
    fn outcome(&self, outcome: &ActionOutcome);
}

/// Reporter that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn outcome(&self, _outcome: &ActionOutcome) {}
}

/// Drives a target set through an operation.
pub struct BulkActionRunner<'a, G: ?Sized> {
    gateway: &'a G,
    per_item_delay: Duration,
}

impl<'a, G: DialogGateway + ?Sized> BulkActionRunner<'a, G> {
    /// Creates a runner with the given pacing delay between successful items.
    #[must_use]
    pub const fn new(gateway: &'a G, per_item_delay: Duration) -> Self {
        Self {
            gateway,
            per_item_delay,
        }
    }

    /// Runs `operation` over every target in order.
    pub async fn run(
        &self,
        targets: &TargetSet,
        operation: &Operation,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let total = targets.len();
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };

        info!("Running {} on {} targets", operation.name(), total);

        for (index, target) in targets.iter().enumerate() {
            let settled = self
                .settle(target, operation, index + 1, total, reporter)
                .await?;

            if settled {
                summary.succeeded += 1;
                if !self.per_item_delay.is_zero() {
                    sleep(self.per_item_delay).await;
                }
            } else {
                summary.failed += 1;
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            "{} finished: {}/{} succeeded, {} failed in {:.1}s",
            operation.name(),
            summary.succeeded,
            summary.total,
            summary.failed,
            summary.elapsed_seconds()
        );
        Ok(summary)
    }

    /// Attempts one target until it succeeds or fails with a non-rate-limit error.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` on a per-target failure.
    async fn settle(
        &self,
        target: &DialogRef,
        operation: &Operation,
        position: usize,
        total: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<bool, RunError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = operation.attempt(self.gateway, target).await;

            let status = match result {
                Ok(()) => OutcomeStatus::Success,
                Err(ActionError::RateLimited(seconds)) => OutcomeStatus::RateLimited(seconds),
                Err(ActionError::Disconnected(reason)) => {
                    warn!("Connection lost while processing {}: {}", target.id, reason);
                    return Err(RunError::Connection(reason));
                }
                Err(e @ (ActionError::InvalidTarget(_) | ActionError::Failed(_))) => {
                    warn!("{} failed for {}: {}", operation.name(), target.id, e);
                    OutcomeStatus::Failed(e.to_string())
                }
            };

            reporter.outcome(&ActionOutcome {
                target: target.clone(),
                status: status.clone(),
                attempt,
                position,
                total: Some(total),
            });

            match status {
                OutcomeStatus::Success => return Ok(true),
                OutcomeStatus::Failed(_) => return Ok(false),
                OutcomeStatus::RateLimited(seconds) => {
                    debug!(
                        "Flood wait on {} (attempt {}): sleeping {}s",
                        target.id, attempt, seconds
                    );
                    sleep(Duration::from_secs(u64::from(seconds))).await;
                }
            }
        }
    }
}
