//! Notifications produced by event transitions, and their text templates.

use chrono::NaiveDateTime;

/// Separator between attendee names.
const NAME_SEPARATOR: &str = ", ";

/// Weekday and 24-hour time, e.g. `Mon 17:45`.
const TIME_FORMAT: &str = "%a %H:%M";

/// A notification to post after a successful transition.
///
/// Each variant carries a snapshot of the event, so rendering needs no access to state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Created { time: NaiveDateTime },
    Status { time: NaiveDateTime, attendees: Vec<String> },
    Added { time: NaiveDateTime, attendees: Vec<String> },
    Removed { time: NaiveDateTime, attendees: Vec<String> },
    Cancelled,
    TimeChanged { time: NaiveDateTime },
}

impl Notice {
    /// Renders the notification text under the given event title.
    pub fn render(&self, title: &str) -> String {
        match self {
            Notice::Created { time } => format!("[{title}]\n\nA new {title} event is created for {}.", time.format(TIME_FORMAT)),
            Notice::Status { time, attendees } => format!("[{title}]\n\n{}", summary(time, attendees)),
            Notice::Added { time, attendees } => format!("[{title}]\n\nYou are added to the list!\n\n{}", summary(time, attendees)),
            Notice::Removed { time, attendees } => format!("[{title}]\n\nYou are removed from the list!\n\n{}", summary(time, attendees)),
            Notice::Cancelled => format!("[{title}]\n\nNobody is going.\n🦀 {title} is cancelled. 🦀"),
            Notice::TimeChanged { time } => format!("[{title}]\n\nTime is updated to {}.", time.format(TIME_FORMAT)),
        }
    }
}

fn summary(time: &NaiveDateTime, attendees: &[String]) -> String {
    format!("🕒 {}\nPeople that are going:\n{}", time.format(TIME_FORMAT), attendees.join(NAME_SEPARATOR))
}
