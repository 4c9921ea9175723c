//! Classifies inbound messages into event commands.

use chrono::TimeZone;

use crate::base::{
    config::Config,
    types::{Ignored, InboundMessage},
};

use super::engine::EventState;

/// What a message asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CreateEvent,
    StatusQuery,
    AddSelf,
    RemoveSelf,
    SetTime { hours: u32, minutes: u32 },
    Ignore(Ignored),
}

impl Intent {
    /// Whether applying this intent needs the sender's contact resolved.
    pub fn needs_sender(&self) -> bool {
        matches!(self, Intent::CreateEvent | Intent::AddSelf | Intent::RemoveSelf)
    }
}

/// The literal tokens that make up the command language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTokens {
    pub create: String,
    pub status: String,
    pub add: String,
    pub remove: String,
}

impl Default for CommandTokens {
    fn default() -> Self {
        Self {
            create: "_?_".to_string(),
            status: "?".to_string(),
            add: "+1".to_string(),
            remove: "-1".to_string(),
        }
    }
}

/// Turns messages into intents, scoped to one conversation and to messages sent after startup.
#[derive(Debug, Clone)]
pub struct CommandParser {
    tokens: CommandTokens,
    conversation_id: String,
    start_timestamp: i64,
}

impl CommandParser {
    pub fn new(tokens: CommandTokens, conversation_id: impl Into<String>, start_timestamp: i64) -> Self {
        Self {
            tokens,
            conversation_id: conversation_id.into(),
            start_timestamp,
        }
    }

    pub fn from_config(config: &Config, start_timestamp: i64) -> Self {
        let tokens = CommandTokens {
            create: config.create_token.trim().to_string(),
            status: config.status_token.trim().to_string(),
            add: config.add_token.trim().to_string(),
            remove: config.remove_token.trim().to_string(),
        };

        Self::new(tokens, config.allowed_channel_id.trim(), start_timestamp)
    }

    /// Whether the message was sent in the allowed conversation after startup.
    pub fn in_scope(&self, message: &InboundMessage) -> bool {
        message.timestamp >= self.start_timestamp && message.conversation_id == self.conversation_id
    }

    pub fn parse<Tz: TimeZone>(&self, state: Option<&EventState<Tz>>, message: &InboundMessage) -> Intent {
        if !self.in_scope(message) {
            return Intent::Ignore(Ignored::OutOfScope);
        }

        let text = message.text.trim();

        let Some(state) = state else {
            return if text == self.tokens.create {
                Intent::CreateEvent
            } else {
                Intent::Ignore(Ignored::Unrecognized)
            };
        };

        // A repeated trigger shows the running event and opens a new thread for it.
        if text == self.tokens.create {
            return Intent::StatusQuery;
        }

        let in_thread = message.replied_to.as_deref().is_some_and(|id| state.is_reply_anchor(id));
        if !in_thread {
            return Intent::Ignore(Ignored::NotInThread);
        }

        if text == self.tokens.status {
            Intent::StatusQuery
        } else if text.starts_with(&self.tokens.add) {
            Intent::AddSelf
        } else if text.starts_with(&self.tokens.remove) {
            Intent::RemoveSelf
        } else if let Some((hours, minutes)) = parse_time(text) {
            Intent::SetTime { hours, minutes }
        } else if text.contains(':') {
            Intent::Ignore(Ignored::MalformedTime)
        } else {
            Intent::Ignore(Ignored::Unrecognized)
        }
    }
}

/// Parses `H:MM` or `HH:MM` into a valid hour and minute.
fn parse_time(text: &str) -> Option<(u32, u32)> {
    let (hours, minutes) = text.split_once(':')?;

    let hours = parse_component(hours)?;
    let minutes = parse_component(minutes)?;

    (hours <= 23 && minutes <= 59).then_some((hours, minutes))
}

fn parse_component(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveTime};

    use super::*;
    use crate::interaction::engine::{Attendee, EventEngine};

    const START: i64 = 1_700_000_000;

    fn parser() -> CommandParser {
        CommandParser::new(CommandTokens::default(), "C0RALLY", START)
    }

    fn message(text: &str, replied_to: Option<&str>) -> InboundMessage {
        InboundMessage {
            text: text.to_string(),
            sender_id: "U0ALICE".to_string(),
            conversation_id: "C0RALLY".to_string(),
            message_id: "1700000100.000200".to_string(),
            replied_to: replied_to.map(str::to_string),
            timestamp: START + 100,
        }
    }

    fn active_state() -> EventState<FixedOffset> {
        let now = FixedOffset::east_opt(3600).unwrap().with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let engine = EventEngine::new(NaiveTime::from_hms_opt(17, 45, 0).unwrap());
        let trigger = message("_?_", None);
        let alice = Attendee::new("U0ALICE", "Alice");

        engine.create(&trigger, alice, &now).unwrap()
    }

    #[test]
    fn test_create_only_without_event() {
        let p = parser();

        assert_eq!(p.parse::<FixedOffset>(None, &message("_?_", None)), Intent::CreateEvent);
        assert_eq!(p.parse::<FixedOffset>(None, &message("hello", None)), Intent::Ignore(Ignored::Unrecognized));
        assert_eq!(p.parse::<FixedOffset>(None, &message("+1", Some("x"))), Intent::Ignore(Ignored::Unrecognized));
    }

    #[test]
    fn test_repeated_trigger_is_status() {
        let state = active_state();

        assert_eq!(parser().parse(Some(&state), &message("_?_", None)), Intent::StatusQuery);
    }

    #[test]
    fn test_commands_require_reply_to_anchor() {
        let p = parser();
        let state = active_state();

        assert_eq!(p.parse(Some(&state), &message("+1", None)), Intent::Ignore(Ignored::NotInThread));
        assert_eq!(p.parse(Some(&state), &message("+1", Some("some-other-message"))), Intent::Ignore(Ignored::NotInThread));
        assert_eq!(p.parse(Some(&state), &message("+1", Some("1700000100.000200"))), Intent::AddSelf);
    }

    #[test]
    fn test_command_order() {
        let p = parser();
        let state = active_state();
        let anchor = Some("1700000100.000200");

        assert_eq!(p.parse(Some(&state), &message("?", anchor)), Intent::StatusQuery);
        assert_eq!(p.parse(Some(&state), &message("+1 see you there", anchor)), Intent::AddSelf);
        assert_eq!(p.parse(Some(&state), &message("-1 sorry", anchor)), Intent::RemoveSelf);
        assert_eq!(p.parse(Some(&state), &message("18:30", anchor)), Intent::SetTime { hours: 18, minutes: 30 });
        assert_eq!(p.parse(Some(&state), &message("9:05", anchor)), Intent::SetTime { hours: 9, minutes: 5 });
        assert_eq!(p.parse(Some(&state), &message("?!", anchor)), Intent::Ignore(Ignored::Unrecognized));
        assert_eq!(p.parse(Some(&state), &message("+", anchor)), Intent::Ignore(Ignored::Unrecognized));
    }

    #[test]
    fn test_malformed_times() {
        let p = parser();
        let state = active_state();
        let anchor = Some("1700000100.000200");

        for text in ["9:75", "24:00", "12:60", "12:", ":30", "1:2:3", "ab:cd", "123:00", "-3:00pm"] {
            assert!(matches!(p.parse(Some(&state), &message(text, anchor)), Intent::Ignore(_)), "`{text}` should be ignored");
        }

        assert_eq!(p.parse(Some(&state), &message("9:75", anchor)), Intent::Ignore(Ignored::MalformedTime));
    }

    #[test]
    fn test_out_of_scope() {
        let p = parser();

        let mut early = message("_?_", None);
        early.timestamp = START - 1;

        let mut elsewhere = message("_?_", None);
        elsewhere.conversation_id = "C0OTHER".to_string();

        assert_eq!(p.parse::<FixedOffset>(None, &early), Intent::Ignore(Ignored::OutOfScope));
        assert_eq!(p.parse::<FixedOffset>(None, &elsewhere), Intent::Ignore(Ignored::OutOfScope));
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("0:00"), Some((0, 0)));
        assert_eq!(parse_time("23:59"), Some((23, 59)));
        assert_eq!(parse_time("+1:30"), None);
        assert_eq!(parse_time(" 1:30"), None);
    }
}
