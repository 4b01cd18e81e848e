//! Controller lifecycle state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the worker reports what happened as an [`Event`], [`transition`] decides
//! the next [`ControllerState`] and which [`Notification`]s go out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, Notification};
pub use state::{CadenceMode, ControllerState, UnknownMode};
pub use transition::{transition, TransitionError, TransitionResult};
