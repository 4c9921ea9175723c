//! Common types and result aliases.

/// The application error type.
pub type Err = anyhow::Error;
/// A result with the application error type.
pub type Res<T> = Result<T, Err>;
/// A result that carries no value.
pub type Void = Res<()>;

/// A text message as delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The raw message text.
    pub text: String,
    /// The id of the user who sent the message.
    pub sender_id: String,
    /// The conversation (channel) the message was posted in.
    pub conversation_id: String,
    /// The id of this message.
    pub message_id: String,
    /// The id of the message this one replies to, if any.
    pub replied_to: Option<String>,
    /// Unix timestamp of the message, in seconds.
    pub timestamp: i64,
}

impl InboundMessage {
    /// The id notifications about this message should be threaded under.
    pub fn thread_anchor(&self) -> &str {
        self.replied_to.as_deref().unwrap_or(&self.message_id)
    }
}

/// Why a message produced no state change and no notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// Wrong conversation, or sent before the bot started.
    OutOfScope,
    /// Not a reply to the trigger message or a status request.
    NotInThread,
    /// Text matches no command.
    Unrecognized,
    /// Looked like a time, but was not a valid `hours:minutes`.
    MalformedTime,
    /// The sender could not be resolved to a contact.
    UnresolvableSender,
    /// The active event was already in the past and has been dropped.
    StaleEvent,
    /// The sender is already on the list.
    AlreadyAttending,
    /// The sender is not on the list.
    NotAttending,
}
