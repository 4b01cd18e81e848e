//! Property-based tests for the state machine
//!
//! These tests verify the notification ordering invariants hold for any
//! sequence of worker events, including nonsensical ones.

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::EngineLoaded),
        Just(Event::SetupCompleted),
        Just(Event::GateParked),
        Just(Event::TurnStarted),
        Just(Event::TurnCompleted),
        Just(Event::Disposed),
        "[a-zA-Z ]{0,20}".prop_map(|message| Event::Faulted { message }),
    ]
}

fn arb_mode() -> impl Strategy<Value = CadenceMode> {
    prop_oneof![
        Just(CadenceMode::Run),
        Just(CadenceMode::RunOne),
        Just(CadenceMode::Step),
    ]
}

/// A well-formed run: setup, some gated or free turns, then an ending
fn arb_run() -> impl Strategy<Value = Vec<Event>> {
    (
        proptest::collection::vec(any::<bool>(), 0..8),
        prop_oneof![Just(None), "[a-z]{1,10}".prop_map(Some)],
    )
        .prop_map(|(gates, failure)| {
            let mut events = vec![Event::EngineLoaded, Event::SetupCompleted];
            for gated in gates {
                if gated {
                    events.push(Event::GateParked);
                }
                events.push(Event::TurnStarted);
                events.push(Event::TurnCompleted);
            }
            match failure {
                Some(message) => events.push(Event::Faulted { message }),
                None => events.push(Event::Disposed),
            }
            events
        })
}

/// Feed events the way the worker does, dropping rejected ones
fn drive(events: Vec<Event>) -> (ControllerState, Vec<Notification>) {
    let mut state = ControllerState::New;
    let mut emitted = Vec::new();
    for event in events {
        if let Ok(result) = transition(&state, event) {
            state = result.new_state;
            emitted.extend(result.effects.into_iter().map(|Effect::Notify(n)| n));
        }
    }
    (state, emitted)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_action_done_never_precedes_setup_done(events in proptest::collection::vec(arb_event(), 0..40)) {
        let (_, emitted) = drive(events);
        let first_setup = emitted.iter().position(|n| *n == Notification::SetupDone);
        if let Some(first_action) = emitted.iter().position(|n| *n == Notification::ActionDone) {
            prop_assert!(first_setup.is_some_and(|s| s < first_action));
        }
    }

    #[test]
    fn prop_at_most_one_setup_and_one_terminal(events in proptest::collection::vec(arb_event(), 0..40)) {
        let (_, emitted) = drive(events);
        prop_assert!(emitted.iter().filter(|n| **n == Notification::SetupDone).count() <= 1);
        prop_assert!(emitted.iter().filter(|n| n.is_terminal()).count() <= 1);
    }

    #[test]
    fn prop_nothing_after_terminal(events in proptest::collection::vec(arb_event(), 0..40)) {
        let (state, emitted) = drive(events);
        if let Some(pos) = emitted.iter().position(Notification::is_terminal) {
            prop_assert_eq!(pos, emitted.len() - 1);
            prop_assert!(state.is_terminal());
        }
    }

    #[test]
    fn prop_terminal_states_absorb(events in proptest::collection::vec(arb_event(), 0..40), tail in arb_event()) {
        let (state, _) = drive(events);
        if state.is_terminal() {
            prop_assert!(transition(&state, tail).is_err());
        }
    }

    #[test]
    fn prop_error_messages_are_never_empty(events in proptest::collection::vec(arb_event(), 0..40)) {
        let (_, emitted) = drive(events);
        for n in emitted {
            if let Notification::Error { message } = n {
                prop_assert!(!message.trim().is_empty());
            }
        }
    }

    #[test]
    fn prop_well_formed_run_matches_grammar(events in arb_run()) {
        let turns = events.iter().filter(|e| **e == Event::TurnCompleted).count();
        let failed = matches!(events.last(), Some(Event::Faulted { .. }));
        let (state, emitted) = drive(events);

        prop_assert_eq!(emitted.len(), turns + 2);
        prop_assert_eq!(&emitted[0], &Notification::SetupDone);
        prop_assert!(emitted[1..=turns].iter().all(|n| *n == Notification::ActionDone));
        if failed {
            let is_error = matches!(emitted.last(), Some(Notification::Error { .. }));
            prop_assert!(is_error);
            let is_failed = matches!(state, ControllerState::Failed { .. });
            prop_assert!(is_failed);
        } else {
            prop_assert_eq!(emitted.last(), Some(&Notification::DisposeDone));
            prop_assert_eq!(state, ControllerState::Disposed);
        }
    }

    #[test]
    fn prop_mode_tags_round_trip(mode in arb_mode()) {
        prop_assert_eq!(mode.as_str().parse::<CadenceMode>().unwrap(), mode);
        prop_assert_eq!(CadenceMode::from_u8(mode.as_u8()), mode);
    }

    #[test]
    fn prop_unknown_mode_tags_rejected(tag in "[a-z_]{0,10}") {
        prop_assert!(tag.parse::<CadenceMode>().is_err());
    }
}
