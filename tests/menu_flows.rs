//! End-to-end menu flows against an in-memory Telegram account.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use telega::actions::{BulkAction, KindFilter, SpamPhase};
use telega::config::RunSettings;
use telega::menu::{Flow, MenuAction, PromptError, Prompter, SessionMenu};
use telega::telegram::{ActionError, DialogGateway, Me, RawDialog};

#[derive(Default)]
struct Account {
    dialogs: Vec<RawDialog>,
    saved: Option<String>,
    responses: Mutex<HashMap<i64, VecDeque<Result<(), ActionError>>>>,
    calls: Mutex<Vec<(&'static str, i64)>>,
    sent: Mutex<Vec<(i64, String)>>,
}

impl Account {
    fn new() -> Self {
        Self {
            dialogs: vec![
                RawDialog::own(1, "Me"),
                RawDialog::user(10, "Alice", None),
                RawDialog::user(11, "Bob", Some("Jones")),
                RawDialog::basic_group(20, "Family"),
                RawDialog::channel(21, "Devs", true),
                RawDialog::channel(30, "News", false),
                RawDialog::bot(40, "Helper"),
            ],
            ..Self::default()
        }
    }

    fn respond(&self, target: i64, responses: Vec<Result<(), ActionError>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(target, responses.into());
    }

    fn calls(&self) -> Vec<(&'static str, i64)> {
        self.calls.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn call(&self, op: &'static str, target: i64) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push((op, target));
        self.responses
            .lock()
            .unwrap()
            .get_mut(&target)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl DialogGateway for Account {
    async fn list_dialogs(&self) -> Result<Vec<RawDialog>, ActionError> {
        Ok(self.dialogs.clone())
    }

    async fn send_message(&self, target: i64, text: &str) -> Result<(), ActionError> {
        self.call("send", target)?;
        self.sent.lock().unwrap().push((target, text.to_owned()));
        Ok(())
    }

    async fn delete_dialog(&self, target: i64) -> Result<(), ActionError> {
        self.call("delete", target)
    }

    async fn block_user(&self, target: i64) -> Result<(), ActionError> {
        self.call("block", target)
    }

    async fn saved_message(&self) -> Result<Option<String>, ActionError> {
        Ok(self.saved.clone())
    }
}

enum Answer {
    Pick(usize),
    Text(&'static str),
    Yes(bool),
}

#[derive(Default)]
struct Script {
    answers: Mutex<VecDeque<Answer>>,
    output: Mutex<Vec<String>>,
}

impl Script {
    fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            output: Mutex::new(Vec::new()),
        }
    }

    fn printed(&self, needle: &str) -> bool {
        self.output.lock().unwrap().iter().any(|l| l.contains(needle))
    }

    fn next(&self) -> Result<Answer, PromptError> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(PromptError::Exhausted)
    }
}

impl Prompter for Script {
    fn select(&self, prompt: &str, _items: &[String]) -> Result<usize, PromptError> {
        match self.next()? {
            Answer::Pick(index) => Ok(index),
            _ => panic!("unexpected selection: {prompt}"),
        }
    }

    fn input(&self, prompt: &str, _default: Option<&str>) -> Result<String, PromptError> {
        match self.next()? {
            Answer::Text(text) => Ok(text.to_owned()),
            _ => panic!("unexpected input: {prompt}"),
        }
    }

    fn password(&self, prompt: &str) -> Result<String, PromptError> {
        self.input(prompt, None)
    }

    fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
        match self.next()? {
            Answer::Yes(yes) => Ok(yes),
            _ => panic!("unexpected confirmation: {prompt}"),
        }
    }

    fn pause(&self) -> Result<(), PromptError> {
        Ok(())
    }

    fn say(&self, line: &str) {
        self.output.lock().unwrap().push(line.to_owned());
    }

    fn clear(&self) {}
}

fn menu_entry(action: MenuAction) -> Answer {
    let index = MenuAction::all()
        .iter()
        .position(|a| *a == action)
        .unwrap();
    Answer::Pick(index)
}

fn settings() -> RunSettings {
    RunSettings {
        item_delay_secs: 1.0,
        spam_delay_secs: 1.0,
        risky_delay_secs: 0.5,
    }
}

fn session<'a>(account: &Arc<Account>, script: &'a Script) -> SessionMenu<'a, Account> {
    SessionMenu::new(
        Arc::clone(account),
        settings(),
        script,
        Me {
            id: 1,
            display_name: "Tester".to_owned(),
        },
        "+15550001234".to_owned(),
    )
}

#[tokio::test]
async fn list_then_exit() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![
        menu_entry(MenuAction::ListDialogs(KindFilter::Groups)),
        menu_entry(MenuAction::Exit),
    ]);

    let flow = session(&account, &script).run().await.unwrap();

    assert_eq!(flow, Flow::Exit);
    assert!(script.printed("Tester | ***1234"));
    assert!(script.printed("Groups (2)"));
    assert!(script.printed("Family"));
    assert!(script.printed("Devs"));
    assert!(!script.printed("News"));
    assert!(account.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delete_bots_requires_the_typed_phrase() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![
        menu_entry(MenuAction::Bulk(BulkAction::DeleteBots)),
        Answer::Text("delete"),
        menu_entry(MenuAction::Bulk(BulkAction::DeleteBots)),
        Answer::Text("DELETE"),
        menu_entry(MenuAction::SwitchAccount),
    ]);

    let flow = session(&account, &script).run().await.unwrap();

    assert_eq!(flow, Flow::SwitchAccount);
    assert!(script.printed("Cancelled."));
    assert!(script.printed("Deleted Helper (40)"));
    assert_eq!(account.calls(), vec![("delete", 40)]);
}

#[tokio::test(start_paused = true)]
async fn leave_groups_waits_out_flood_and_counts_failures() {
    let account = Arc::new(Account::new());
    account.respond(20, vec![Err(ActionError::RateLimited(5)), Ok(())]);
    account.respond(21, vec![Err(ActionError::Failed("CHAT_ADMIN_REQUIRED".to_owned()))]);

    let script = Script::new(vec![Answer::Text("LEAVE")]);
    let menu = session(&account, &script);

    let started = tokio::time::Instant::now();
    let flow = menu
        .handle(MenuAction::Bulk(BulkAction::LeaveGroups))
        .await
        .unwrap();

    assert_eq!(flow, Flow::Continue);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(script.printed("Flood wait 5s on Family (20)"));
    assert!(script.printed("CHAT_ADMIN_REQUIRED"));
    assert!(script.printed("Leave all groups: 1 succeeded, 1 failed of 2"));
    assert_eq!(
        account.calls(),
        vec![("delete", 20), ("delete", 20), ("delete", 21)]
    );
}

#[tokio::test]
async fn broadcast_without_saved_message_touches_nothing() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![]);

    session(&account, &script)
        .handle(MenuAction::Bulk(BulkAction::BroadcastUsers))
        .await
        .unwrap();

    assert!(script.printed("No text message in Saved Messages"));
    assert!(account.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn broadcast_sends_the_saved_message() {
    let account = Arc::new(Account {
        saved: Some("Hello everyone".to_owned()),
        ..Account::new()
    });
    let script = Script::new(vec![Answer::Text("SEND")]);

    session(&account, &script)
        .handle(MenuAction::Bulk(BulkAction::BroadcastUsers))
        .await
        .unwrap();

    assert!(script.printed("Message: Hello everyone"));
    assert_eq!(
        account.sent(),
        vec![
            (10, "Hello everyone".to_owned()),
            (11, "Hello everyone".to_owned())
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn spam_runs_in_background_until_stopped() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![
        // target: pick from private chats, then Bob
        Answer::Pick(3),
        Answer::Pick(1),
        // message: typed
        Answer::Pick(0),
        Answer::Text("ping"),
        Answer::Text("1"),
        Answer::Yes(true),
    ]);
    let menu = session(&account, &script);

    menu.handle(MenuAction::StartSpam).await.unwrap();
    assert_eq!(menu.spam().phase(), SpamPhase::Running);
    assert!(script.printed("Spam started to Bob Jones (11)"));

    // A second start is refused without touching the running loop.
    menu.handle(MenuAction::StartSpam).await.unwrap();
    assert!(script.printed("already running"));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    menu.handle(MenuAction::StopSpam).await.unwrap();
    assert!(script.printed("Stopping spam loop"));

    menu.teardown().await;
    assert_eq!(menu.spam().phase(), SpamPhase::Idle);
    assert_eq!(menu.spam().sent_count(), 3);
    assert!(script.printed("Sent: 3"));
    assert!(account.sent().iter().all(|(id, text)| *id == 11 && text == "ping"));
}

#[tokio::test(start_paused = true)]
async fn risky_delay_can_be_declined() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![
        Answer::Pick(0),
        Answer::Text(" 77 "),
        Answer::Pick(0),
        Answer::Text("ping"),
        Answer::Text("0.1"),
        Answer::Yes(false),
    ]);
    let menu = session(&account, &script);

    menu.handle(MenuAction::StartSpam).await.unwrap();

    assert_eq!(menu.spam().phase(), SpamPhase::Idle);
    assert!(account.calls().is_empty());
}

#[tokio::test]
async fn invalid_spam_target_is_reported() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![Answer::Pick(0), Answer::Text("@someone")]);

    session(&account, &script)
        .handle(MenuAction::StartSpam)
        .await
        .unwrap();

    assert!(script.printed("Invalid chat id: '@someone'"));
}

#[tokio::test(start_paused = true)]
async fn exit_joins_a_running_spam_loop() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![
        menu_entry(MenuAction::StartSpam),
        Answer::Pick(0),
        Answer::Text("10"),
        Answer::Pick(0),
        Answer::Text("hi"),
        Answer::Text("2"),
        Answer::Yes(true),
        menu_entry(MenuAction::Exit),
    ]);
    let menu = session(&account, &script);

    let flow = menu.run().await.unwrap();

    assert_eq!(flow, Flow::Exit);
    assert_eq!(menu.spam().phase(), SpamPhase::Idle);
    assert!(script.printed("Spam to 10 stopped."));
}

#[tokio::test(start_paused = true)]
async fn spam_can_be_declined_at_the_final_prompt() {
    let account = Arc::new(Account::new());
    let script = Script::new(vec![
        Answer::Pick(0),
        Answer::Text("10"),
        Answer::Pick(0),
        Answer::Text("hi"),
        Answer::Text("2"),
        Answer::Yes(false),
    ]);
    let menu = session(&account, &script);

    menu.handle(MenuAction::StartSpam).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(menu.spam().phase(), SpamPhase::Idle);
    assert!(script.printed("Cancelled."));
    assert!(!script.printed("Spam started"));
    assert!(account.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_spam_does_not_wait_out_a_flood_wait() {
    let account = Arc::new(Account::new());
    account.respond(10, vec![Err(ActionError::RateLimited(3600))]);
    let script = Script::new(vec![
        Answer::Pick(0),
        Answer::Text("10"),
        Answer::Pick(0),
        Answer::Text("hi"),
        Answer::Text("2"),
        Answer::Yes(true),
    ]);
    let menu = session(&account, &script);

    menu.handle(MenuAction::StartSpam).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(account.calls(), vec![("send", 10)]);

    let asked_at = tokio::time::Instant::now();
    menu.handle(MenuAction::StopSpam).await.unwrap();
    menu.teardown().await;

    assert!(asked_at.elapsed() < Duration::from_secs(5));
    assert_eq!(menu.spam().phase(), SpamPhase::Idle);
    assert!(script.printed("Spam to 10 stopped."));
    assert!(script.printed("Sent: 0"));
    assert_eq!(account.calls(), vec![("send", 10)]);
}
