//! Telega - Main Entry Point
//!
//! Interactive Telegram userbot: list dialogs, broadcast to them, leave,
//! delete or block them in bulk, and run a background spam loop, all paced
//! around Telegram's flood waits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use telega::config::{Account, AccountRegistry, RunSettings, TelegramConfig};
use telega::menu::{AccountChoice, AccountMenu, DialoguerPrompter, Flow, Prompter, SessionMenu};
use telega::telegram::{TelegramBot, TelegramError, mask_phone};

/// Interactive Telegram userbot for bulk dialog actions.
#[derive(Parser, Debug)]
#[command(name = "telega")]
#[command(about = "Broadcast to, leave, delete or block Telegram dialogs in bulk")]
#[command(version)]
struct Args {
    /// Path to the saved accounts JSON file.
    #[arg(short, long, default_value = "accounts.json")]
    accounts: PathBuf,

    /// Directory holding one session file per account.
    #[arg(short, long, default_value = "sessions")]
    sessions_dir: PathBuf,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let settings = RunSettings::from_env_with_defaults();
    debug!("Run settings: {:?}", settings);

    std::fs::create_dir_all(&args.sessions_dir).with_context(|| {
        format!(
            "Failed to create sessions directory {}",
            args.sessions_dir.display()
        )
    })?;

    let mut registry = AccountRegistry::load(&args.accounts);
    let prompter = DialoguerPrompter;

    loop {
        let choice = AccountMenu::new(&mut registry, &args.sessions_dir, &prompter).choose()?;
        let AccountChoice::Use(account) = choice else {
            break;
        };

        match run_account(&account, &args.sessions_dir, settings, &prompter).await {
            Ok(Flow::Exit) => break,
            Ok(_) => {}
            Err(e) => {
                error!("Session for {} ended: {:#}", mask_phone(&account.phone), e);
                prompter.say(&format!("[✗] {e:#}"));
                prompter.pause()?;
            }
        }
    }

    info!("Goodbye");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Connects one account, signs in if needed and runs its menu.
async fn run_account(
    account: &Account,
    sessions_dir: &Path,
    settings: RunSettings,
    prompter: &dyn Prompter,
) -> Result<Flow> {
    let config = TelegramConfig::for_account(account, sessions_dir);
    prompter.say(&format!("Connecting {}...", account.phone));

    let bot = TelegramBot::connect(&config)
        .await
        .context("Failed to connect to Telegram")?;

    signed_in_session(bot, &config, settings, prompter).await
}

async fn signed_in_session(
    bot: TelegramBot,
    config: &TelegramConfig,
    settings: RunSettings,
    prompter: &dyn Prompter,
) -> Result<Flow> {
    let bot = Arc::new(bot);

    let flow = async {
        if !bot
            .is_authorized()
            .await
            .context("Failed to check authorization")?
        {
            authenticate(&bot, config, prompter).await?;
        }

        let me = bot.me().await.context("Failed to load the signed-in user")?;
        info!("Signed in as {} ({})", me.display_name, me.id);

        let menu = SessionMenu::new(
            Arc::clone(&bot),
            settings,
            prompter,
            me,
            config.phone.clone(),
        );
        menu.run().await.context("Session ended")
    }
    .await;

    bot.disconnect();
    flow
}

/// Handles Telegram authentication.
async fn authenticate(
    bot: &TelegramBot,
    config: &TelegramConfig,
    prompter: &dyn Prompter,
) -> Result<()> {
    info!("Authentication required for {}", mask_phone(&config.phone));

    let token = bot
        .request_login_code(&config.phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    prompter.say("Login code sent to your Telegram app");
    let code = prompter.input("Enter the login code", None)?;

    let mut password_token = match bot.sign_in(&token, code.trim()).await {
        Ok(()) => return Ok(()),
        Err(TelegramError::PasswordRequired(password_token)) => password_token,
        Err(e) => return Err(e).context("Authentication failed"),
    };

    prompter.say("Two-factor authentication is enabled");
    loop {
        let hint = password_token.hint().unwrap_or("no hint");
        let password = prompter.password(&format!("Enter your 2FA password (hint: {hint})"))?;

        match bot.check_password(password_token, &password).await {
            Ok(()) => {
                info!("Successfully signed in with 2FA!");
                return Ok(());
            }
            Err(TelegramError::InvalidPassword(token)) => {
                prompter.say("[✗] Invalid password, try again");
                password_token = token;
            }
            Err(e) => return Err(e).context("2FA authentication failed"),
        }
    }
}
