//! Spam loop: one message to one target, repeated until stopped.
//!
//! The loop follows a small state machine held in [`SpamController`]:
//! - `Idle → Running` on start, only from `Idle` (compare-and-set)
//! - `Running → Stopping` on a stop request from the menu
//! - `Running | Stopping → Idle` when the loop observes the request, or on
//!   the first non-rate-limit failure
//!
//! The stop flag is checked before each send, and every sleep (the pacing
//! delay and a flood wait alike) wakes as soon as a stop is requested. A
//! request therefore takes effect after at most one in-flight send completes.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::dialog::DialogRef;
use super::operation::Operation;
use super::runner::{ActionOutcome, OutcomeStatus, ProgressReporter};
use crate::telegram::{ActionError, DialogGateway};

/// Errors returned when starting a spam loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpamError {
    #[error("A spam loop is already running")]
    AlreadyRunning,

    #[error("Invalid delay: {0} (must be a positive number of seconds)")]
    InvalidDelay(String),
}

/// Lifecycle phase of the session's spam loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamPhase {
    Idle,
    Running,
    Stopping,
}

impl SpamPhase {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopping => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// Parameters of one spam loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamJob {
    pub target: DialogRef,
    pub message: String,
    pub delay: Duration,
}

impl SpamJob {
    /// Creates a job, validating the delay given in (possibly fractional) seconds.
    pub fn new(target: DialogRef, message: String, delay_secs: f64) -> Result<Self, SpamError> {
        Ok(Self {
            target,
            message,
            delay: parse_delay(delay_secs)?,
        })
    }
}

/// Converts a user-supplied delay to a [`Duration`], rejecting zero, negatives and NaN.
pub fn parse_delay(secs: f64) -> Result<Duration, SpamError> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).map_err(|_| SpamError::InvalidDelay(secs.to_string()))
    } else {
        Err(SpamError::InvalidDelay(secs.to_string()))
    }
}

/// Why a spam loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamEnd {
    /// The user asked to stop.
    Stopped,
    /// The target does not resolve.
    InvalidTarget(String),
    /// Any other non-rate-limit error.
    Failed(String),
}

/// Final report of a spam loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamReport {
    pub target: DialogRef,
    pub sent: u64,
    pub elapsed: Duration,
    pub end: SpamEnd,
}

/// Snapshot of a running loop for the menu header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamStatus {
    pub phase: SpamPhase,
    pub target: DialogRef,
    pub sent: u64,
    pub elapsed: Duration,
}

#[derive(Debug)]
struct ActiveJob {
    target: DialogRef,
    started_at: Instant,
}

/// Session-scoped spam state shared by the menu and the background task.
#[derive(Debug)]
pub struct SpamController {
    phase: AtomicU8,
    sent: AtomicU64,
    stop: watch::Sender<bool>,
    job: Mutex<Option<ActiveJob>>,
    task: Mutex<Option<JoinHandle<SpamReport>>>,
}

impl Default for SpamController {
    fn default() -> Self {
        Self::new()
    }
}

impl SpamController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            phase: AtomicU8::new(SpamPhase::Idle.as_u8()),
            sent: AtomicU64::new(0),
            stop,
            job: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SpamPhase {
        SpamPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Checks if a loop is active (running or winding down).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase() != SpamPhase::Idle
    }

    /// Number of messages sent by the current (or last) loop.
    #[must_use]
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    /// Moves `Idle → Running` and records the new job.
    ///
    /// Leaves a running loop untouched and returns [`SpamError::AlreadyRunning`].
    pub fn try_start(&self, job: &SpamJob) -> Result<(), SpamError> {
        self.phase
            .compare_exchange(
                SpamPhase::Idle.as_u8(),
                SpamPhase::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| SpamError::AlreadyRunning)?;

        self.sent.store(0, Ordering::Release);
        self.stop.send_replace(false);
        *self.job.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveJob {
            target: job.target.clone(),
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Moves `Running → Stopping` and wakes a sleeping loop.
    ///
    /// Returns false if no loop was running. Never waits for the loop.
    pub fn request_stop(&self) -> bool {
        let stopping = self
            .phase
            .compare_exchange(
                SpamPhase::Running.as_u8(),
                SpamPhase::Stopping.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if stopping {
            self.stop.send_replace(true);
        }
        stopping
    }

    /// Status of the active loop, if any.
    #[must_use]
    pub fn status(&self) -> Option<SpamStatus> {
        let phase = self.phase();
        if phase == SpamPhase::Idle {
            return None;
        }
        let job = self.job.lock().unwrap_or_else(PoisonError::into_inner);
        job.as_ref().map(|job| SpamStatus {
            phase,
            target: job.target.clone(),
            sent: self.sent_count(),
            elapsed: job.started_at.elapsed(),
        })
    }

    /// Requests a stop and waits for the background task to finish.
    ///
    /// Returns the loop's report, or `None` if no loop was spawned.
    pub async fn shutdown(&self) -> Option<SpamReport> {
        self.request_stop();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        match task.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Spam task ended abnormally: {}", e);
                self.finish();
                None
            }
        }
    }

    fn should_continue(&self) -> bool {
        self.phase() == SpamPhase::Running
    }

    fn record_sent(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn finish(&self) {
        self.phase.store(SpamPhase::Idle.as_u8(), Ordering::Release);
    }

    fn started_at(&self) -> Option<Instant> {
        self.job
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|job| job.started_at)
    }
}

/// Starts a spam loop as a detached background task.
///
/// The task handle is kept in the controller so the session can join it on
/// teardown via [`SpamController::shutdown`].
pub fn spawn<G>(
    gateway: Arc<G>,
    controller: Arc<SpamController>,
    job: SpamJob,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<(), SpamError>
where
    G: DialogGateway + ?Sized + 'static,
{
    controller.try_start(&job)?;

    let loop_controller = Arc::clone(&controller);
    let handle = tokio::spawn(async move {
        run_loop(gateway.as_ref(), &loop_controller, &job, reporter.as_ref()).await
    });

    // A previous loop's handle is finished by now (the phase was Idle).
    *controller.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    Ok(())
}

/// Runs the loop on the current task until it is stopped or fails.
///
/// The controller must already be `Running` (see [`SpamController::try_start`]).
pub async fn run_loop<G: DialogGateway + ?Sized>(
    gateway: &G,
    controller: &SpamController,
    job: &SpamJob,
    reporter: &dyn ProgressReporter,
) -> SpamReport {
    let started_at = controller.started_at().unwrap_or_else(Instant::now);
    let operation = Operation::SendMessage(job.message.clone());
    let mut stop = controller.stop.subscribe();
    let mut attempt = 0;

    info!(
        "Spam loop started: target {}, delay {:.3}s",
        job.target.id,
        job.delay.as_secs_f64()
    );

    let end = loop {
        if !controller.should_continue() {
            break SpamEnd::Stopped;
        }

        attempt += 1;
        match operation.attempt(gateway, &job.target).await {
            Ok(()) => {
                let sent = controller.record_sent();
                reporter.outcome(&outcome(job, OutcomeStatus::Success, attempt, sent));
                attempt = 0;
                if !pause(&mut stop, job.delay).await {
                    break SpamEnd::Stopped;
                }
            }
            Err(ActionError::RateLimited(seconds)) => {
                let status = OutcomeStatus::RateLimited(seconds);
                reporter.outcome(&outcome(job, status, attempt, controller.sent_count()));
                debug!("Spam loop rate limited, sleeping {}s", seconds);
                let retry_after = Duration::from_secs(u64::from(seconds));
                if !pause(&mut stop, retry_after).await {
                    break SpamEnd::Stopped;
                }
            }
            Err(ActionError::InvalidTarget(reason)) => {
                let status = OutcomeStatus::Failed(reason.clone());
                reporter.outcome(&outcome(job, status, attempt, controller.sent_count()));
                break SpamEnd::InvalidTarget(reason);
            }
            Err(e @ (ActionError::Failed(_) | ActionError::Disconnected(_))) => {
                let reason = e.to_string();
                let status = OutcomeStatus::Failed(reason.clone());
                reporter.outcome(&outcome(job, status, attempt, controller.sent_count()));
                break SpamEnd::Failed(reason);
            }
        }
    };

    controller.finish();
    let report = SpamReport {
        target: job.target.clone(),
        sent: controller.sent_count(),
        elapsed: started_at.elapsed(),
        end,
    };
    info!(
        "Spam loop ended ({:?}): {} messages in {:.1}s",
        report.end,
        report.sent,
        report.elapsed.as_secs_f64()
    );
    report
}

/// Sleeps for `duration` unless a stop arrives first. Returns false if stopped.
async fn pause(stop: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        () = sleep(duration) => true,
        _ = stop.wait_for(|stopping| *stopping) => false,
    }
}

fn outcome(job: &SpamJob, status: OutcomeStatus, attempt: u32, position: u64) -> ActionOutcome {
    ActionOutcome {
        target: job.target.clone(),
        status,
        attempt,
        position: usize::try_from(position).unwrap_or(usize::MAX),
        total: None,
    }
}
