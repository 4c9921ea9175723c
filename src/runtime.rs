//! Runtime services and shared state for the rally-bot.

use chrono::Utc;
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::scheduler::Scheduler,
    service::chat::ChatClient,
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the scheduler, chat client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The event scheduler instance.
    pub scheduler: Scheduler,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    ///
    /// Messages sent before this point are ignored.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        let start_timestamp = Utc::now().timestamp();

        // Initialize the scheduler.
        let scheduler = Scheduler::new(&config, start_timestamp)?;

        // Initialize the slack client.
        let chat = ChatClient::slack(&config, scheduler.clone()).await?;

        info!(start_timestamp, channel = %config.allowed_channel_id, "Runtime initialized.");

        Ok(Self { config, scheduler, chat })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}

/// Waits for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT - shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM - shutting down"),
                }
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received SIGINT - shutting down");
    }
}
