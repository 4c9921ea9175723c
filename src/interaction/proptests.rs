//! Property-based tests for the event engine.
//!
//! These tests verify the attendee and time invariants hold across arbitrary command sequences.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone};
use proptest::prelude::*;

use super::{
    command::Intent,
    engine::{Attendee, EventEngine, EventState, Outcome},
    notice::Notice,
};
use crate::base::types::InboundMessage;

fn now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

fn engine() -> EventEngine {
    EventEngine::new(NaiveTime::from_hms_opt(17, 45, 0).unwrap())
}

fn message() -> InboundMessage {
    InboundMessage {
        text: String::new(),
        sender_id: String::new(),
        conversation_id: "C0RALLY".to_string(),
        message_id: "trigger".to_string(),
        replied_to: None,
        timestamp: 0,
    }
}

fn person(n: u8) -> Attendee {
    Attendee::new(format!("U{n}"), format!("Person {n}"))
}

fn created() -> EventState<FixedOffset> {
    engine().create(&message(), person(0), &now()).unwrap()
}

fn arb_membership_step() -> impl Strategy<Value = (bool, u8)> {
    (any::<bool>(), 0u8..6)
}

proptest! {
    #[test]
    fn attendees_stay_unique_and_non_empty(steps in prop::collection::vec(arb_membership_step(), 0..40)) {
        let engine = engine();
        let mut state = Some(created());

        for (join, who) in steps {
            let Some(current) = state.as_ref() else {
                break;
            };

            let intent = if join { Intent::AddSelf } else { Intent::RemoveSelf };
            let transition = engine.step(Some(current), intent, &message(), Some(person(who)), &now()).unwrap();

            if let Some(next) = &transition.state {
                let ids: Vec<_> = next.attendees().iter().map(|a| a.id.clone()).collect();
                let mut unique = ids.clone();
                unique.sort();
                unique.dedup();

                prop_assert!(!ids.is_empty());
                prop_assert_eq!(ids.len(), unique.len());
            } else {
                prop_assert_eq!(transition.outcome, Outcome::Notify(Notice::Cancelled));
            }

            state = transition.state;
        }
    }

    #[test]
    fn set_time_only_changes_time_of_day(hours in 0u32..30, minutes in 0u32..70) {
        let state = created();
        let before = *state.scheduled_time();

        let transition = engine().step(Some(&state), Intent::SetTime { hours, minutes }, &message(), None, &now()).unwrap();
        let after = *transition.state.unwrap().scheduled_time();

        prop_assert_eq!(after.date_naive(), before.date_naive());

        if hours <= 23 && minutes <= 59 {
            prop_assert_eq!(after.naive_local().time(), NaiveTime::from_hms_opt(hours, minutes, 0).unwrap());
        } else {
            prop_assert_eq!(after, before);
        }
    }

    #[test]
    fn create_then_remove_last_ends_without_event(who in 0u8..6) {
        let engine = engine();
        let creator = person(who);

        let created = engine.step(None, Intent::CreateEvent, &message(), Some(creator.clone()), &now()).unwrap();
        let removed = engine.step(created.state.as_ref(), Intent::RemoveSelf, &message(), Some(creator), &now()).unwrap();

        prop_assert!(removed.state.is_none());
    }
}
