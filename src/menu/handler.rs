//! Main menu of one signed-in account.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::prompt::{PromptError, Prompter};
use super::render::{self, ConsoleReporter, LogReporter};
use super::types::{Flow, MenuAction};
use crate::actions::{
    BulkAction, BulkPlan, BulkRun, DialogRef, KindFilter, RunError, SpamController, SpamJob,
    TargetSelector, broadcast_message, spam,
};
use crate::config::RunSettings;
use crate::telegram::{ActionError, DialogGateway, Me, truncate_for_log};

/// Errors that end an account session.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Connection lost: {0}")]
    Connection(String),
}

/// Interactive session over one connected account.
///
/// Owns the session's [`SpamController`]; an active loop is stopped and
/// joined when [`SessionMenu::run`] returns.
pub struct SessionMenu<'a, G: ?Sized> {
    gateway: Arc<G>,
    spam: Arc<SpamController>,
    settings: RunSettings,
    prompter: &'a dyn Prompter,
    me: Me,
    phone: String,
}

impl<'a, G: DialogGateway + ?Sized + 'static> SessionMenu<'a, G> {
    /// Creates a menu with an idle spam controller.
    pub fn new(
        gateway: Arc<G>,
        settings: RunSettings,
        prompter: &'a dyn Prompter,
        me: Me,
        phone: String,
    ) -> Self {
        Self {
            gateway,
            spam: Arc::new(SpamController::new()),
            settings,
            prompter,
            me,
            phone,
        }
    }

    /// The session's spam state.
    #[must_use]
    pub const fn spam(&self) -> &Arc<SpamController> {
        &self.spam
    }

    /// Shows the main menu until the user switches account or exits.
    pub async fn run(&self) -> Result<Flow, MenuError> {
        let result = self.menu_loop().await;
        self.teardown().await;
        result
    }

    async fn menu_loop(&self) -> Result<Flow, MenuError> {
        let actions = MenuAction::all();
        let labels: Vec<String> = actions.iter().map(|a| a.label()).collect();

        loop {
            self.frame("Main menu");
            self.report_finished_spam().await;

            let choice = self.prompter.select("Choose an action", &labels)?;
            let Some(action) = actions.get(choice).copied() else {
                continue;
            };

            match self.handle(action).await? {
                Flow::Continue => self.prompter.pause()?,
                flow => return Ok(flow),
            }
        }
    }

    /// Performs one menu action.
    pub async fn handle(&self, action: MenuAction) -> Result<Flow, MenuError> {
        info!("Menu action: {}", action.title());

        match action {
            MenuAction::SwitchAccount => return Ok(Flow::SwitchAccount),
            MenuAction::Exit => return Ok(Flow::Exit),
            _ => self.frame(&action.title()),
        }

        match action {
            MenuAction::ListDialogs(filter) => self.list_dialogs(filter).await?,
            MenuAction::Bulk(bulk) => self.run_bulk(bulk).await?,
            MenuAction::StartSpam => self.start_spam().await?,
            MenuAction::StopSpam => self.stop_spam(),
            MenuAction::SwitchAccount | MenuAction::Exit => {}
        }
        Ok(Flow::Continue)
    }

    /// Stops and joins the spam loop, printing its report.
    pub async fn teardown(&self) {
        if self.spam.is_active() {
            info!("Stopping spam loop before leaving the session");
        }
        if let Some(report) = self.spam.shutdown().await {
            self.prompter.say(&render::spam_report(&report));
        }
    }

    fn frame(&self, action: &str) {
        self.prompter.clear();
        let status = self.spam.status();
        self.prompter
            .say(&render::header(&self.me, &self.phone, action, status.as_ref()));
    }

    /// Prints the report of a loop that ended on its own.
    async fn report_finished_spam(&self) {
        if self.spam.is_active() {
            return;
        }
        if let Some(report) = self.spam.shutdown().await {
            self.prompter.say(&render::spam_report(&report));
        }
    }

    fn notice(&self, line: &str) {
        self.prompter.say(&format!("[!] {line}"));
    }

    /// Reports a per-call error, escalating a lost connection.
    fn action_failed(&self, err: ActionError) -> Result<(), MenuError> {
        match err {
            ActionError::Disconnected(reason) => Err(MenuError::Connection(reason)),
            other => {
                self.notice(&other.to_string());
                Ok(())
            }
        }
    }

    async fn list_dialogs(&self, filter: KindFilter) -> Result<(), MenuError> {
        match TargetSelector::new(self.gateway.as_ref()).select(filter).await {
            Ok(targets) => {
                self.prompter.say(&render::dialog_table(filter, &targets));
                Ok(())
            }
            Err(e) => self.action_failed(e),
        }
    }

    async fn run_bulk(&self, action: BulkAction) -> Result<(), MenuError> {
        let gateway = self.gateway.as_ref();

        let plan = match BulkPlan::prepare(gateway, action).await {
            Ok(plan) => plan,
            Err(RunError::Enumerate(e)) => return self.action_failed(e),
            Err(RunError::Connection(reason)) => return Err(MenuError::Connection(reason)),
            Err(e @ (RunError::NoBroadcastMessage | RunError::SavedMessage(_))) => {
                self.notice(&e.to_string());
                return Ok(());
            }
        };

        if plan.is_empty() {
            self.notice(&format!("No {} found.", action.filter().label().to_lowercase()));
            return Ok(());
        }

        self.prompter.say(&format!(
            "{}: {} target(s)",
            action.label(),
            plan.targets.len()
        ));
        if let Some(text) = plan.message() {
            self.prompter
                .say(&format!("Message: {}", truncate_for_log(text, 80)));
        }

        let phrase = action.confirmation_phrase();
        let typed = self
            .prompter
            .input(&format!("Type {phrase} to confirm"), None)?;
        let confirmed = typed.trim() == phrase;

        let reporter = ConsoleReporter::new(self.prompter, action.done_verb());
        match plan
            .execute(gateway, confirmed, self.settings.item_delay(), &reporter)
            .await
        {
            Ok(BulkRun::Completed(summary)) => {
                self.prompter.say(&render::summary(action.label(), &summary));
            }
            Ok(BulkRun::Declined) => self.prompter.say("Cancelled."),
            Err(RunError::Connection(reason)) => return Err(MenuError::Connection(reason)),
            Err(e) => self.notice(&e.to_string()),
        }
        Ok(())
    }

    async fn start_spam(&self) -> Result<(), MenuError> {
        if self.spam.is_active() {
            self.notice("A spam loop is already running. Stop it first.");
            return Ok(());
        }

        let Some(target) = self.pick_spam_target().await? else {
            return Ok(());
        };
        let Some(message) = self.pick_spam_message().await? else {
            return Ok(());
        };
        let Some(delay) = self.ask_spam_delay()? else {
            return Ok(());
        };

        let job = match SpamJob::new(target, message, delay) {
            Ok(job) => job,
            Err(e) => {
                self.notice(&e.to_string());
                return Ok(());
            }
        };
        let target = job.target.clone();

        if !self.prompter.confirm(&format!("Start spam to {target}?"))? {
            self.prompter.say("Cancelled.");
            return Ok(());
        }

        match spam::spawn(
            Arc::clone(&self.gateway),
            Arc::clone(&self.spam),
            job,
            Arc::new(LogReporter),
        ) {
            Ok(()) => self.prompter.say(&format!(
                "[▶] Spam started to {target} every {delay}s. Use \"Stop spam\" to stop it."
            )),
            Err(e) => self.notice(&e.to_string()),
        }
        Ok(())
    }

    async fn pick_spam_target(&self) -> Result<Option<DialogRef>, MenuError> {
        let mut items = vec!["Enter chat ID".to_owned()];
        items.extend(
            KindFilter::ALL
                .iter()
                .map(|f| format!("{} Pick from {}", f.icon(), f.label().to_lowercase())),
        );
        items.push("Cancel".to_owned());

        let choice = self.prompter.select("Spam target", &items)?;
        if choice == 0 {
            let raw = self.prompter.input("Chat ID", None)?;
            return Ok(match TargetSelector::new(self.gateway.as_ref()).select_by_id(&raw) {
                Ok(target) => Some(target),
                Err(e) => {
                    self.notice(&e.to_string());
                    None
                }
            });
        }

        let Some(filter) = KindFilter::ALL.get(choice - 1).copied() else {
            return Ok(None);
        };

        let targets = match TargetSelector::new(self.gateway.as_ref()).select(filter).await {
            Ok(targets) => targets,
            Err(e) => {
                self.action_failed(e)?;
                return Ok(None);
            }
        };
        if targets.is_empty() {
            self.notice(&format!("No {} found.", filter.label().to_lowercase()));
            return Ok(None);
        }

        let mut names: Vec<String> = targets.iter().map(ToString::to_string).collect();
        names.push("Cancel".to_owned());
        let picked = self.prompter.select("Choose a chat", &names)?;
        Ok(targets.get(picked).cloned())
    }

    async fn pick_spam_message(&self) -> Result<Option<String>, MenuError> {
        let items = [
            "Type a message".to_owned(),
            "Use the newest saved message".to_owned(),
            "Cancel".to_owned(),
        ];

        match self.prompter.select("Message source", &items)? {
            0 => {
                let text = self.prompter.input("Message text", None)?;
                if text.trim().is_empty() {
                    self.notice("Message cannot be empty.");
                    return Ok(None);
                }
                Ok(Some(text))
            }
            1 => match broadcast_message(self.gateway.as_ref()).await {
                Ok(text) => {
                    self.prompter
                        .say(&format!("Message: {}", truncate_for_log(&text, 80)));
                    Ok(Some(text))
                }
                Err(RunError::Connection(reason)) => Err(MenuError::Connection(reason)),
                Err(e) => {
                    self.notice(&e.to_string());
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn ask_spam_delay(&self) -> Result<Option<f64>, MenuError> {
        let default = self.settings.spam_delay_secs.to_string();
        let raw = self
            .prompter
            .input("Delay between messages (seconds)", Some(&default))?;

        let delay = match raw.trim().parse::<f64>() {
            Ok(delay) if spam::parse_delay(delay).is_ok() => delay,
            _ => {
                self.notice(&format!(
                    "Invalid delay: '{}' (must be a positive number of seconds)",
                    raw.trim()
                ));
                return Ok(None);
            }
        };

        if self.settings.is_risky(delay) {
            warn!("Risky spam delay requested: {}s", delay);
            let prompt = format!("A {delay}s delay is likely to get the account limited. Continue?");
            if !self.prompter.confirm(&prompt)? {
                return Ok(None);
            }
        }
        Ok(Some(delay))
    }

    /// Signals the loop and returns; its report is printed once it has ended.
    fn stop_spam(&self) {
        if self.spam.request_stop() {
            self.prompter
                .say("[■] Stopping spam loop. Its report follows once it has stopped.");
        } else {
            self.notice("No spam loop is running.");
        }
    }
}
