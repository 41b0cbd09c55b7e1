//! Interactive terminal menus.
//!
//! The account manager runs first; once signed in, [`SessionMenu`] maps
//! each main menu entry onto one of the dialog actions.

mod accounts;
mod handler;
mod prompt;
pub mod render;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use accounts::{AccountChoice, AccountMenu};
pub use handler::{MenuError, SessionMenu};
pub use prompt::{DialoguerPrompter, PromptError, Prompter};
pub use types::{Flow, MenuAction};
