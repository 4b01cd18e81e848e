//! Pure state transition function
//!
//! All ordering guarantees subscribers rely on live here: `SETUP_DONE`
//! exactly once and first, `ACTION_DONE` only after it, and at most one
//! terminal notification, after which every event is rejected.

use super::{ControllerState, Effect, Event};
use thiserror::Error;

/// Message used when a failure carries no text of its own
const UNKNOWN_FAILURE: &str = "unknown failure";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ControllerState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ControllerState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Controller is {0}; the run is over")]
    Terminal(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ControllerState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if state.is_terminal() {
        return Err(TransitionError::Terminal(state.name()));
    }

    match (state, event) {
        // start_engine may replace the engine until the worker takes over
        (ControllerState::New | ControllerState::Started, Event::EngineLoaded) => {
            Ok(TransitionResult::new(ControllerState::Started))
        }

        (ControllerState::Started, Event::SetupCompleted) => {
            Ok(TransitionResult::new(ControllerState::SetupDone)
                .with_effect(Effect::notify_setup_done()))
        }

        (ControllerState::SetupDone | ControllerState::RunningTurn, Event::GateParked) => {
            Ok(TransitionResult::new(ControllerState::Suspended))
        }

        (
            ControllerState::SetupDone | ControllerState::Suspended | ControllerState::RunningTurn,
            Event::TurnStarted,
        ) => Ok(TransitionResult::new(ControllerState::RunningTurn)),

        (ControllerState::RunningTurn, Event::TurnCompleted) => {
            Ok(TransitionResult::new(ControllerState::RunningTurn)
                .with_effect(Effect::notify_action_done()))
        }

        // has_done() may already hold right after setup, or after any turn
        (ControllerState::SetupDone | ControllerState::RunningTurn, Event::Disposed) => {
            Ok(TransitionResult::new(ControllerState::Disposed)
                .with_effect(Effect::notify_dispose_done()))
        }

        (_, Event::Faulted { message }) => {
            let message = if message.trim().is_empty() {
                UNKNOWN_FAILURE.to_string()
            } else {
                message
            };
            Ok(TransitionResult::new(ControllerState::Failed {
                message: message.clone(),
            })
            .with_effect(Effect::notify_error(message)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {}",
            state.name()
        ))),
    }
}
