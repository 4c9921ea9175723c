//! The event state machine.
//!
//! [`EventEngine::step`] is a pure transition: it takes the current state, an intent, and the
//! current time, and returns the next state together with at most one notification. It never
//! touches the chat service.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use thiserror::Error;

use crate::base::{
    config::Config,
    types::{Ignored, InboundMessage, Res},
};

use super::{command::Intent, notice::Notice};

/// Someone on the attendee list.
///
/// Identity is the sender id; the name is only used when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub id: String,
    pub name: String,
}

impl Attendee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// The active event.
#[derive(Debug, Clone)]
pub struct EventState<Tz: TimeZone> {
    scheduled_time: DateTime<Tz>,
    attendees: Vec<Attendee>,
    reply_anchors: HashSet<String>,
}

impl<Tz: TimeZone> EventState<Tz> {
    pub fn scheduled_time(&self) -> &DateTime<Tz> {
        &self.scheduled_time
    }

    pub fn attendees(&self) -> &[Attendee] {
        &self.attendees
    }

    /// Attendee names in the order they joined.
    pub fn attendee_names(&self) -> Vec<String> {
        self.attendees.iter().map(|a| a.name.clone()).collect()
    }

    /// Whether replies to this message id are accepted as commands.
    pub fn is_reply_anchor(&self, message_id: &str) -> bool {
        self.reply_anchors.contains(message_id)
    }

    pub fn is_expired(&self, now: &DateTime<Tz>) -> bool {
        self.scheduled_time < *now
    }

    fn is_attending(&self, id: &str) -> bool {
        self.attendees.iter().any(|a| a.id == id)
    }

    fn status(&self) -> Notice {
        Notice::Status {
            time: self.scheduled_time.naive_local(),
            attendees: self.attendee_names(),
        }
    }
}

/// What a transition asks the caller to do, besides storing the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Post this notification.
    Notify(Notice),
    /// Do nothing.
    Silent(Ignored),
}

/// Result of a state transition.
#[derive(Debug)]
pub struct Transition<Tz: TimeZone> {
    pub state: Option<EventState<Tz>>,
    pub outcome: Outcome,
}

impl<Tz: TimeZone> Transition<Tz> {
    fn notify(state: Option<EventState<Tz>>, notice: Notice) -> Self {
        Self { state, outcome: Outcome::Notify(notice) }
    }

    fn silent(state: Option<EventState<Tz>>, reason: Ignored) -> Self {
        Self { state, outcome: Outcome::Silent(reason) }
    }
}

/// Intents that the parser can never produce for the given state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("An event is already active; it cannot be created again")]
    EventAlreadyActive,
    #[error("No event is active for {0:?}")]
    NoActiveEvent(Intent),
    #[error("The event time cannot be represented in the local timezone")]
    UnrepresentableTime,
}

/// Applies intents to the event state.
#[derive(Debug, Clone)]
pub struct EventEngine {
    default_time: NaiveTime,
}

impl EventEngine {
    pub fn new(default_time: NaiveTime) -> Self {
        Self { default_time }
    }

    pub fn from_config(config: &Config) -> Res<Self> {
        Ok(Self::new(config.default_time()?))
    }

    /// Applies one intent.
    ///
    /// `sender` is the resolved contact of the message author, if any; intents that need it are
    /// dropped when it is missing.
    pub fn step<Tz: TimeZone>(&self, state: Option<&EventState<Tz>>, intent: Intent, message: &InboundMessage, sender: Option<Attendee>, now: &DateTime<Tz>) -> Result<Transition<Tz>, TransitionError> {
        // Out-of-scope traffic must not even expire the event.
        if let Intent::Ignore(Ignored::OutOfScope) = intent {
            return Ok(Transition::silent(state.cloned(), Ignored::OutOfScope));
        }

        let Some(state) = state else {
            return match intent {
                Intent::CreateEvent => match sender {
                    Some(creator) => {
                        let created = self.create(message, creator, now)?;
                        let notice = Notice::Created { time: created.scheduled_time.naive_local() };
                        Ok(Transition::notify(Some(created), notice))
                    }
                    None => Ok(Transition::silent(None, Ignored::UnresolvableSender)),
                },
                Intent::Ignore(reason) => Ok(Transition::silent(None, reason)),
                other => Err(TransitionError::NoActiveEvent(other)),
            };
        };

        if state.is_expired(now) {
            return Ok(Transition::silent(None, Ignored::StaleEvent));
        }

        let mut next = state.clone();

        match intent {
            Intent::CreateEvent => Err(TransitionError::EventAlreadyActive),
            Intent::Ignore(reason) => Ok(Transition::silent(Some(next), reason)),
            Intent::StatusQuery => {
                next.reply_anchors.insert(message.message_id.clone());
                let notice = next.status();
                Ok(Transition::notify(Some(next), notice))
            }
            Intent::AddSelf => {
                let Some(sender) = sender else {
                    return Ok(Transition::silent(Some(next), Ignored::UnresolvableSender));
                };

                if next.is_attending(&sender.id) {
                    return Ok(Transition::silent(Some(next), Ignored::AlreadyAttending));
                }

                next.attendees.push(sender);

                let notice = Notice::Added {
                    time: next.scheduled_time.naive_local(),
                    attendees: next.attendee_names(),
                };
                Ok(Transition::notify(Some(next), notice))
            }
            Intent::RemoveSelf => {
                let Some(sender) = sender else {
                    return Ok(Transition::silent(Some(next), Ignored::UnresolvableSender));
                };

                if !next.is_attending(&sender.id) {
                    return Ok(Transition::silent(Some(next), Ignored::NotAttending));
                }

                next.attendees.retain(|a| a.id != sender.id);

                if next.attendees.is_empty() {
                    return Ok(Transition::notify(None, Notice::Cancelled));
                }

                let notice = Notice::Removed {
                    time: next.scheduled_time.naive_local(),
                    attendees: next.attendee_names(),
                };
                Ok(Transition::notify(Some(next), notice))
            }
            Intent::SetTime { hours, minutes } => {
                let Some(time) = with_time_of_day(&next.scheduled_time, hours, minutes) else {
                    return Ok(Transition::silent(Some(next), Ignored::MalformedTime));
                };

                next.scheduled_time = time;

                let notice = Notice::TimeChanged { time: next.scheduled_time.naive_local() };
                Ok(Transition::notify(Some(next), notice))
            }
        }
    }

    /// Creates a new event for the trigger message, with its author as the first attendee.
    pub fn create<Tz: TimeZone>(&self, trigger: &InboundMessage, creator: Attendee, now: &DateTime<Tz>) -> Result<EventState<Tz>, TransitionError> {
        Ok(EventState {
            scheduled_time: self.default_instant(now)?,
            attendees: vec![creator],
            reply_anchors: HashSet::from([trigger.message_id.clone()]),
        })
    }

    /// Today at the default time, or tomorrow if that has already passed.
    fn default_instant<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, TransitionError> {
        let today = now
            .date_naive()
            .and_time(self.default_time)
            .and_local_timezone(now.timezone())
            .earliest()
            .ok_or(TransitionError::UnrepresentableTime)?;

        if today < *now { Ok(today + Duration::days(1)) } else { Ok(today) }
    }
}

/// Moves `time` to `hours:minutes` on the same local date.
///
/// An ambiguous local time resolves to its earliest instant; a time skipped by a clock change
/// yields `None`.
fn with_time_of_day<Tz: TimeZone>(time: &DateTime<Tz>, hours: u32, minutes: u32) -> Option<DateTime<Tz>> {
    time.date_naive().and_hms_opt(hours, minutes, 0)?.and_local_timezone(time.timezone()).earliest()
}
