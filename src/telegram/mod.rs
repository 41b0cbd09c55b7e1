//! Telegram client wrapper module.
//!
//! [`DialogGateway`] is the seam the actions are written against;
//! [`TelegramBot`] implements it on top of an `MTProto` connection and also
//! handles sign-in.

mod client;
mod gateway;

pub use client::{Me, TelegramBot, TelegramError, mask_phone, truncate_for_log};
pub use gateway::{ActionError, DialogGateway, RawDialog, RawEntity};
