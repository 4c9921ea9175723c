//! Library root for `rally-bot`.
//!
//! Rally-bot watches a single Slack channel and keeps track of one gathering at a time:
//! - Someone posts the trigger token, and an event is created for the default time
//! - Replies in the event's thread join, leave, change the time, or ask for the status
//! - Every change is announced back in the thread
//! - The event quietly disappears once its time has passed
//!
//! The command language and the event state machine live in [`interaction`] and do no I/O;
//! the chat platform sits behind the [`service::chat::GenericChatClient`] trait.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the rally-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the scheduler and chat client
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting rally-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow::anyhow!("Failed to install the default crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
