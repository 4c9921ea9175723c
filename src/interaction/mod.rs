//! Event handling and user interactions for rally-bot.
//!
//! This module provides the gathering logic driven by chat messages:
//! - Classifying messages into commands
//! - Applying commands to the single active event
//! - Rendering the notifications posted back to the channel

pub mod chat_event;
pub mod command;
pub mod engine;
pub mod notice;
pub mod scheduler;

#[cfg(test)]
mod proptests;
