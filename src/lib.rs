//! Telega Library
//!
//! An interactive Telegram userbot for bulk dialog actions.
//!
//! This crate provides the core functionality for:
//! - Classifying the account's dialogs (channels, groups, private chats, bots)
//! - Running broadcast, leave, delete and block actions over them in order
//! - A cancellable background spam loop, one per session
//! - Waiting out Telegram flood and slow-mode limits instead of failing
//! - Saved accounts and the interactive menus on top

pub mod actions;
pub mod config;
pub mod menu;
pub mod telegram;
