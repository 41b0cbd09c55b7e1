//! Text rendering for headers, tables, progress lines and summaries.

use std::fmt::Write as _;

use crossterm::style::Stylize;
use tracing::{debug, warn};

use super::prompt::Prompter;
use crate::actions::{
    ActionOutcome, KindFilter, OutcomeStatus, ProgressReporter, RunSummary, SpamEnd, SpamPhase,
    SpamReport, SpamStatus, TargetSet,
};
use crate::telegram::{Me, mask_phone, truncate_for_log};

/// Header shown above every menu frame.
pub fn header(me: &Me, phone: &str, action: &str, spam: Option<&SpamStatus>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "TELEGA".bold().cyan());
    let _ = writeln!(out, "Account: {} | {}", me.display_name, mask_phone(phone));
    let _ = writeln!(out, "Action: {action}");

    if let Some(status) = spam {
        let state = match status.phase {
            SpamPhase::Stopping => "stopping",
            SpamPhase::Running | SpamPhase::Idle => "active",
        };
        let _ = writeln!(
            out,
            "{} spam {state} | target: {} | sent: {} | {}s",
            "[●]".green(),
            status.target,
            status.sent,
            status.elapsed.as_secs()
        );
    }
    out
}

/// Numbered table of one kind of dialog.
pub fn dialog_table(filter: KindFilter, targets: &TargetSet) -> String {
    if targets.is_empty() {
        return format!("{} No {} found.", "[!]".yellow(), filter.label().to_lowercase());
    }

    let width = targets
        .iter()
        .map(|t| t.display_name.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(4, 40);

    let mut out = format!("{} {} ({})\n", filter.icon(), filter.label(), targets.len());
    let _ = writeln!(out, "{:>4}  {:<width$}  ID", "#", "Name");
    for (index, target) in targets.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {}",
            index + 1,
            truncate_for_log(&target.display_name, width),
            target.id
        );
    }
    out
}

/// One progress line for a bulk run.
pub fn outcome_line(verb: &str, outcome: &ActionOutcome) -> String {
    let position = outcome
        .total
        .map_or_else(|| format!("#{}", outcome.position), |total| format!("{}/{total}", outcome.position));

    match &outcome.status {
        OutcomeStatus::Success => {
            format!("{} [{position}] {verb} {}", "[✓]".green(), outcome.target)
        }
        OutcomeStatus::RateLimited(seconds) => format!(
            "{} [{position}] Flood wait {seconds}s on {}, retrying (attempt {})",
            "[⏳]".yellow(),
            outcome.target,
            outcome.attempt
        ),
        OutcomeStatus::Failed(reason) => {
            format!("{} [{position}] {}: {reason}", "[✗]".red(), outcome.target)
        }
    }
}

/// Final counters of a bulk run.
pub fn summary(label: &str, summary: &RunSummary) -> String {
    format!(
        "{} {label}: {} succeeded, {} failed of {} in {:.1}s",
        "[i]".cyan(),
        summary.succeeded,
        summary.failed,
        summary.total,
        summary.elapsed_seconds()
    )
}

/// Final report of a spam loop.
pub fn spam_report(report: &SpamReport) -> String {
    let reason = match &report.end {
        SpamEnd::Stopped => "stopped".to_owned(),
        SpamEnd::InvalidTarget(reason) => format!("invalid target: {reason}"),
        SpamEnd::Failed(reason) => format!("error: {reason}"),
    };
    format!(
        "{} Spam to {} {reason}. Sent: {} in {:.1}s",
        "[■]".cyan(),
        report.target,
        report.sent,
        report.elapsed.as_secs_f64()
    )
}

/// Prints bulk progress through the prompter as it happens.
pub struct ConsoleReporter<'a> {
    prompter: &'a dyn Prompter,
    verb: &'static str,
}

impl<'a> ConsoleReporter<'a> {
    #[must_use]
    pub const fn new(prompter: &'a dyn Prompter, verb: &'static str) -> Self {
        Self { prompter, verb }
    }
}

impl ProgressReporter for ConsoleReporter<'_> {
    fn outcome(&self, outcome: &ActionOutcome) {
        self.prompter.say(&outcome_line(self.verb, outcome));
    }
}

/// Logs spam loop progress; the menu stays interactive meanwhile.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn outcome(&self, outcome: &ActionOutcome) {
        match &outcome.status {
            OutcomeStatus::Success => debug!("Spam #{} sent to {}", outcome.position, outcome.target.id),
            OutcomeStatus::RateLimited(seconds) => {
                warn!("Spam rate limited on {}: waiting {}s", outcome.target.id, seconds);
            }
            OutcomeStatus::Failed(reason) => {
                warn!("Spam to {} failed: {}", outcome.target.id, reason);
            }
        }
    }
}
