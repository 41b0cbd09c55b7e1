//! In-memory gateway and reporter for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::runner::{ActionOutcome, ProgressReporter};
use crate::telegram::{ActionError, DialogGateway, RawDialog};

/// One recorded gateway call.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub target: i64,
    pub at: Instant,
}

/// Gateway with scripted per-target responses.
///
/// Targets without a script (or whose script ran out) succeed.
#[derive(Default)]
pub struct FakeGateway {
    dialogs: Mutex<Vec<RawDialog>>,
    scripts: Mutex<HashMap<i64, VecDeque<Result<(), ActionError>>>>,
    listing_error: Mutex<Option<ActionError>>,
    saved: Mutex<Option<String>>,
    saved_errors: Mutex<VecDeque<ActionError>>,
    calls: Mutex<Vec<Call>>,
    texts: Mutex<Vec<String>>,
    list_calls: Mutex<usize>,
    saved_reads: Mutex<usize>,
}

impl FakeGateway {
    pub fn with_dialogs(dialogs: Vec<RawDialog>) -> Self {
        let gateway = Self::default();
        *gateway.dialogs.lock().unwrap() = dialogs;
        gateway
    }

    pub fn script(&self, target: i64, responses: Vec<Result<(), ActionError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(target, responses.into_iter().collect());
    }

    pub fn fail_listing(&self, error: ActionError) {
        *self.listing_error.lock().unwrap() = Some(error);
    }

    pub fn set_saved_message(&self, text: Option<&str>) {
        *self.saved.lock().unwrap() = text.map(str::to_owned);
    }

    /// Makes the next Saved Messages reads fail, in order.
    pub fn fail_saved_message(&self, errors: Vec<ActionError>) {
        *self.saved_errors.lock().unwrap() = errors.into();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn saved_message_reads(&self) -> usize {
        *self.saved_reads.lock().unwrap()
    }

    fn respond(&self, op: &'static str, target: i64) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push(Call {
            op,
            target,
            at: Instant::now(),
        });
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&target)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl DialogGateway for FakeGateway {
    async fn list_dialogs(&self) -> Result<Vec<RawDialog>, ActionError> {
        *self.list_calls.lock().unwrap() += 1;
        if let Some(error) = self.listing_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.dialogs.lock().unwrap().clone())
    }

    async fn send_message(&self, target: i64, text: &str) -> Result<(), ActionError> {
        let result = self.respond("send_message", target);
        if result.is_ok() {
            self.texts.lock().unwrap().push(text.to_owned());
        }
        result
    }

    async fn delete_dialog(&self, target: i64) -> Result<(), ActionError> {
        self.respond("delete_dialog", target)
    }

    async fn block_user(&self, target: i64) -> Result<(), ActionError> {
        self.respond("block_user", target)
    }

    async fn saved_message(&self) -> Result<Option<String>, ActionError> {
        *self.saved_reads.lock().unwrap() += 1;
        if let Some(error) = self.saved_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.saved.lock().unwrap().clone())
    }
}

/// Reporter that keeps every event.
#[derive(Default)]
pub struct RecordingReporter {
    outcomes: Mutex<Vec<ActionOutcome>>,
}

impl RecordingReporter {
    pub fn outcomes(&self) -> Vec<ActionOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn outcome(&self, outcome: &ActionOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}
