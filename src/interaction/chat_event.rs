//! Entry point for messages arriving from the chat service.

use tracing::{Instrument, error, instrument};

use crate::{
    base::types::{InboundMessage, Void},
    service::chat::ChatClient,
};

use super::scheduler::Scheduler;

/// Handles a chat message event.
///
/// This awaits the full processing of the message before returning, so the
/// transport delivers the next message only once this one has been applied. Errors are logged and
/// never reach the transport.
#[instrument(skip_all)]
pub async fn handle_chat_event(message: InboundMessage, scheduler: Scheduler, chat: ChatClient) {
    // Process the event.
    let result = handle_chat_event_internal(message, &scheduler, &chat).in_current_span().await;

    // Log any errors.
    if let Err(err) = &result {
        error!("Error while handling: {}", err);
    }
}

#[instrument(skip_all)]
async fn handle_chat_event_internal(message: InboundMessage, scheduler: &Scheduler, chat: &ChatClient) -> Void {
    scheduler.handle(message, chat).await
}
