//! The process-wide owner of the event state.

use std::{ops::Deref, sync::Arc};

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{InboundMessage, Res, Void},
    },
    service::chat::ChatClient,
};

use super::{
    command::CommandParser,
    engine::{Attendee, EventEngine, EventState, Outcome},
};

/// Drives the event state machine for the allowed channel.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Deref for Scheduler {
    type Target = SchedulerInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct SchedulerInner {
    parser: CommandParser,
    engine: EventEngine,
    title: String,
    state: Mutex<Option<EventState<Local>>>,
}

impl Scheduler {
    /// Creates a scheduler that ignores messages sent before `start_timestamp`.
    pub fn new(config: &Config, start_timestamp: i64) -> Res<Self> {
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                parser: CommandParser::from_config(config, start_timestamp),
                engine: EventEngine::from_config(config)?,
                title: config.event_title.clone(),
                state: Mutex::new(None),
            }),
        })
    }

    /// Handles one message at the current local time.
    pub async fn handle(&self, message: InboundMessage, chat: &ChatClient) -> Void {
        self.handle_at(message, chat, Local::now()).await
    }

    /// Handles one message as if it arrived at `now`.
    ///
    /// The state lock is held until any notification has been sent, so messages are processed
    /// strictly one after another.
    #[instrument(skip_all, fields(message_id = %message.message_id))]
    pub async fn handle_at(&self, message: InboundMessage, chat: &ChatClient, now: DateTime<Local>) -> Void {
        let mut state = self.state.lock().await;

        let intent = self.parser.parse(state.as_ref(), &message);

        // A stale event is dropped by the engine whatever the intent, so skip the lookup.
        let stale = state.as_ref().is_some_and(|s| s.is_expired(&now));

        let sender = if intent.needs_sender() && !stale { resolve_sender(chat, &message.sender_id).await } else { None };

        let transition = self.engine.step(state.as_ref(), intent, &message, sender, &now)?;

        *state = transition.state;

        match transition.outcome {
            Outcome::Silent(reason) => debug!(?intent, ?reason, "Message ignored."),
            Outcome::Notify(notice) => {
                info!(?intent, "Sending notification ...");

                let text = notice.render(&self.title);

                // Delivery failures are logged, never retried.
                if let Err(err) = chat.send_message(&message.conversation_id, message.thread_anchor(), &text).await {
                    warn!("Failed to send notification: {}", err);
                }
            }
        }

        Ok(())
    }

    /// A copy of the current event, if one is active.
    pub async fn snapshot(&self) -> Option<EventState<Local>> {
        self.state.lock().await.clone()
    }
}

/// Looks up the sender's display name, treating lookup failures as unknown.
async fn resolve_sender(chat: &ChatClient, sender_id: &str) -> Option<Attendee> {
    match chat.resolve_contact(sender_id).await {
        Ok(Some(name)) => Some(Attendee::new(sender_id, name)),
        Ok(None) => {
            debug!(sender_id, "Sender has no known contact.");
            None
        }
        Err(err) => {
            warn!("Failed to resolve contact {}: {}", sender_id, err);
            None
        }
    }
}
