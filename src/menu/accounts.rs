//! Account manager shown before a session starts.

use std::path::Path;

use tracing::info;

use super::prompt::{PromptError, Prompter};
use crate::config::{Account, AccountRegistry};
use crate::telegram::mask_phone;

/// Result of the account manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChoice {
    /// Sign in with this account.
    Use(Account),
    /// Leave the program.
    Exit,
}

/// Select, add and remove saved accounts.
pub struct AccountMenu<'a> {
    registry: &'a mut AccountRegistry,
    sessions_dir: &'a Path,
    prompter: &'a dyn Prompter,
}

impl<'a> AccountMenu<'a> {
    pub fn new(
        registry: &'a mut AccountRegistry,
        sessions_dir: &'a Path,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            registry,
            sessions_dir,
            prompter,
        }
    }

    /// Loops until the user picks an account or exits.
    pub fn choose(&mut self) -> Result<AccountChoice, PromptError> {
        loop {
            self.prompter.clear();
            self.prompter.say("[👤] Telegram account manager");

            if self.registry.is_empty() {
                self.prompter.say("[!] No saved accounts.");
                if !self.prompter.confirm("Add a new account?")? {
                    return Ok(AccountChoice::Exit);
                }
                if let Some(account) = self.add()? {
                    return Ok(AccountChoice::Use(account));
                }
                continue;
            }

            let saved = self.registry.accounts().len();
            let mut items: Vec<String> = self
                .registry
                .accounts()
                .iter()
                .map(|a| format!("[👤] {}", a.phone))
                .collect();
            items.extend([
                "[▶] Add new account".to_owned(),
                "[🗑] Remove account".to_owned(),
                "[🚪] Exit".to_owned(),
            ]);

            let choice = self.prompter.select("Choose an account", &items)?;
            match choice.checked_sub(saved) {
                None => {
                    if let Some(account) = self.registry.accounts().get(choice) {
                        info!("Selected account {}", mask_phone(&account.phone));
                        return Ok(AccountChoice::Use(account.clone()));
                    }
                }
                Some(0) => {
                    if let Some(account) = self.add()? {
                        return Ok(AccountChoice::Use(account));
                    }
                }
                Some(1) => self.remove()?,
                Some(_) => return Ok(AccountChoice::Exit),
            }
        }
    }

    fn add(&mut self) -> Result<Option<Account>, PromptError> {
        self.prompter.say("[▶] Adding a new account");
        let api_id = self.prompter.input("API ID", None)?;
        let api_hash = self.prompter.input("API hash", None)?;
        let phone = self.prompter.input("Phone number (with +)", None)?;

        let added = Account::from_input(&api_id, &api_hash, &phone)
            .and_then(|account| self.registry.add(account.clone()).map(|()| account));

        match added {
            Ok(account) => {
                self.prompter
                    .say(&format!("[✓] Account {} added.", account.phone));
                Ok(Some(account))
            }
            Err(e) => {
                self.prompter.say(&format!("[✗] {e}"));
                self.prompter.pause()?;
                Ok(None)
            }
        }
    }

    fn remove(&mut self) -> Result<(), PromptError> {
        let mut items: Vec<String> = self
            .registry
            .accounts()
            .iter()
            .map(|a| a.phone.clone())
            .collect();
        items.push("Cancel".to_owned());

        let choice = self.prompter.select("Account to remove", &items)?;
        let Some(phone) = self.registry.accounts().get(choice).map(|a| a.phone.clone()) else {
            return Ok(());
        };

        if !self
            .prompter
            .confirm(&format!("Remove {phone} and its session?"))?
        {
            return Ok(());
        }

        match self.registry.remove(&phone, self.sessions_dir) {
            Ok(_) => self.prompter.say("[✓] Account removed."),
            Err(e) => self.prompter.say(&format!("[✗] {e}")),
        }
        self.prompter.pause()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::menu::testing::{Answer, ScriptedPrompter};

    fn registry(name: &str) -> (AccountRegistry, PathBuf) {
        let dir = std::env::temp_dir().join(format!("telega-menu-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        (AccountRegistry::load(dir.join("accounts.json")), dir)
    }

    #[test]
    fn test_empty_registry_declined_exits() {
        let (mut registry, dir) = registry("declined");
        let prompter = ScriptedPrompter::new(vec![Answer::Confirm(false)]);

        let choice = AccountMenu::new(&mut registry, &dir, &prompter).choose().unwrap();
        assert_eq!(choice, AccountChoice::Exit);
        assert!(prompter.said("No saved accounts."));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_add_then_use() {
        let (mut registry, dir) = registry("add");
        let prompter = ScriptedPrompter::new(vec![
            Answer::Confirm(true),
            Answer::Text("4242".to_owned()),
            Answer::Text("hash".to_owned()),
            Answer::Text("+1 555 0100".to_owned()),
        ]);

        let choice = AccountMenu::new(&mut registry, &dir, &prompter).choose().unwrap();
        let AccountChoice::Use(account) = choice else {
            panic!("expected an account");
        };
        assert_eq!(account.api_id, 4242);
        assert_eq!(account.session_name, "session_15550100");
        assert_eq!(registry.accounts().len(), 1);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_invalid_input_is_reported_and_menu_loops() {
        let (mut registry, dir) = registry("invalid");
        let prompter = ScriptedPrompter::new(vec![
            Answer::Confirm(true),
            Answer::Text("not-a-number".to_owned()),
            Answer::Text("hash".to_owned()),
            Answer::Text("+1".to_owned()),
            Answer::Confirm(false),
        ]);

        let choice = AccountMenu::new(&mut registry, &dir, &prompter).choose().unwrap();
        assert_eq!(choice, AccountChoice::Exit);
        assert!(prompter.said("Invalid API ID"));
        assert!(registry.is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_remove_then_select() {
        let (mut registry, dir) = registry("remove");
        registry
            .add(Account::from_input("1", "a", "+111").unwrap())
            .unwrap();
        registry
            .add(Account::from_input("2", "b", "+222").unwrap())
            .unwrap();

        let prompter = ScriptedPrompter::new(vec![
            // "+111", "+222", add, remove, exit
            Answer::Select(3),
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Select(0),
        ]);

        let choice = AccountMenu::new(&mut registry, &dir, &prompter).choose().unwrap();
        let AccountChoice::Use(account) = choice else {
            panic!("expected an account");
        };
        assert_eq!(account.phone, "+222");
        assert_eq!(registry.accounts().len(), 1);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
