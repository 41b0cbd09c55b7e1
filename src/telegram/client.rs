//! Telegram client wrapper for one signed-in user account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::peer::{Peer, User};
use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_session::types::PeerRef;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::gateway::{ActionError, DialogGateway, RawDialog, RawEntity};
use crate::config::TelegramConfig;

/// RPC errors meaning the target id no longer resolves.
const INVALID_TARGET_ERRORS: [&str; 7] = [
    "PEER_ID_INVALID",
    "CHANNEL_INVALID",
    "CHANNEL_PRIVATE",
    "CHAT_ID_INVALID",
    "USER_ID_INVALID",
    "INPUT_USER_DEACTIVATED",
    "USER_IS_BLOCKED",
];

/// Errors that can occur while connecting and signing in.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        Self::Invocation(err.to_string())
    }
}

impl From<InvocationError> for ActionError {
    fn from(err: InvocationError) -> Self {
        match &err {
            InvocationError::Rpc(rpc) => {
                classify_rpc(&rpc.name, rpc.value).unwrap_or_else(|| Self::Failed(err.to_string()))
            }
            InvocationError::Dropped => Self::Disconnected(err.to_string()),
            // Some layers only carry the wait inside the message text.
            _ => classify_text(err.to_string()),
        }
    }
}

/// Maps a parsed RPC error (name with the numeric suffix stripped) to an action error.
fn classify_rpc(name: &str, value: Option<u32>) -> Option<ActionError> {
    let is_wait = name.ends_with("_WAIT")
        && (name.starts_with("FLOOD") || name.starts_with("SLOWMODE"));

    if is_wait {
        return value.map(ActionError::RateLimited);
    }
    if INVALID_TARGET_ERRORS.contains(&name) {
        return Some(ActionError::InvalidTarget(name.to_owned()));
    }
    None
}

/// Classifies a non-RPC error by its message.
fn classify_text(message: String) -> ActionError {
    match extract_flood_wait_seconds(&message) {
        Some(seconds) => ActionError::RateLimited(seconds),
        None => ActionError::Failed(message),
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "SLOWMODE_WAIT_", "FLOOD WAIT "];
    // ASCII-only uppercasing keeps byte offsets valid for `err_msg`.
    let upper = err_msg.to_ascii_uppercase();

    for pattern in patterns {
        if let Some(idx) = upper.find(pattern) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Identity of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Me {
    pub id: i64,
    pub display_name: String,
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Peers seen during the last enumerations, keyed by bare id.
    peers: Mutex<HashMap<i64, PeerRef>>,

    /// Serializes calls on the single connection (menu and spam loop share it).
    call_lock: Mutex<()>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the connection fails.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates: _updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            peers: Mutex::new(HashMap::new()),
            call_lock: Mutex::new(()),
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::PasswordRequired`] when 2FA is enabled.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                Ok(())
            }
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Fetches the signed-in account's identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn me(&self) -> Result<Me, TelegramError> {
        let _guard = self.call_lock.lock().await;
        let user = self.client.get_me().await?;
        let display_name = full_name(&user)
            .or_else(|| user.username().map(str::to_owned))
            .unwrap_or_else(|| "User".to_owned());

        Ok(Me {
            id: user.id().bare_id(),
            display_name,
        })
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }

    /// Looks up a peer reference, refreshing the dialog list once if unknown.
    async fn resolve(&self, target: i64) -> Result<PeerRef, ActionError> {
        if let Some(peer) = self.peers.lock().await.get(&target).copied() {
            return Ok(peer);
        }

        debug!("Peer {} not cached, refreshing dialogs", target);
        self.list_dialogs().await?;

        self.peers
            .lock()
            .await
            .get(&target)
            .copied()
            .ok_or_else(|| ActionError::InvalidTarget(format!("{target} is not in the dialog list")))
    }
}

#[async_trait]
impl DialogGateway for TelegramBot {
    async fn list_dialogs(&self) -> Result<Vec<RawDialog>, ActionError> {
        let _guard = self.call_lock.lock().await;

        let mut iter = self.client.iter_dialogs();
        let mut dialogs = Vec::new();
        let mut peers = HashMap::new();

        while let Some(dialog) = iter.next().await? {
            let raw = raw_dialog(dialog.peer());
            peers.insert(raw.id, dialog.peer_ref());
            dialogs.push(raw);
        }

        debug!("Enumerated {} dialogs", dialogs.len());
        self.peers.lock().await.extend(peers);
        Ok(dialogs)
    }

    async fn send_message(&self, target: i64, text: &str) -> Result<(), ActionError> {
        let peer = self.resolve(target).await?;
        let _guard = self.call_lock.lock().await;
        debug!("Sending \"{}\" to {}", truncate_for_log(text, 30), target);

        self.client.send_message(peer, text).await?;
        Ok(())
    }

    async fn delete_dialog(&self, target: i64) -> Result<(), ActionError> {
        let peer = self.resolve(target).await?;
        let _guard = self.call_lock.lock().await;

        self.client.delete_dialog(peer).await?;
        self.peers.lock().await.remove(&target);
        Ok(())
    }

    async fn block_user(&self, target: i64) -> Result<(), ActionError> {
        let peer = self.resolve(target).await?;
        let _guard = self.call_lock.lock().await;

        let request = tl::functions::contacts::Block {
            my_stories_from: false,
            id: peer.into(),
        };
        self.client.invoke(&request).await?;
        Ok(())
    }

    async fn saved_message(&self) -> Result<Option<String>, ActionError> {
        let _guard = self.call_lock.lock().await;

        let saved = PeerRef::from(tl::types::InputPeerSelf {});
        let mut messages = self.client.iter_messages(saved).limit(1);

        match messages.next().await? {
            Some(message) => {
                let text = message.text().to_owned();
                if text.trim().is_empty() {
                    warn!("Newest saved message has no text");
                    Ok(None)
                } else {
                    Ok(Some(text))
                }
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// Converts a grammers peer into the provider-neutral dialog shape.
fn raw_dialog(peer: &Peer) -> RawDialog {
    let id = peer.id().bare_id();

    match peer {
        Peer::User(user) => RawDialog {
            id,
            entity: RawEntity::User {
                bot: user.is_bot(),
                is_self: user.is_self(),
            },
            title: None,
            first_name: user.first_name().map(str::to_owned),
            last_name: user.last_name().map(str::to_owned),
        },
        Peer::Group(group) => RawDialog {
            id,
            entity: if group.is_megagroup() {
                RawEntity::Channel { megagroup: true }
            } else {
                RawEntity::BasicGroup
            },
            title: group.title().map(str::to_owned),
            first_name: None,
            last_name: None,
        },
        Peer::Channel(channel) => RawDialog {
            id,
            entity: RawEntity::Channel { megagroup: false },
            title: Some(channel.title().to_owned()),
            first_name: None,
            last_name: None,
        },
    }
}

fn full_name(user: &User) -> Option<String> {
    let name = [user.first_name(), user.last_name()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

/// Masks a phone number for logging (shows last 4 digits).
pub fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}

/// Truncates a string for logging purposes.
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
