//! Progress reports from the worker that drive state transitions

use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `start_engine` produced a ready engine
    EngineLoaded,

    /// `reset()` and `setup()` both returned
    SetupCompleted,

    /// The worker parked at the cadence gate
    GateParked,

    /// The worker is past the gate and about to advance the engine
    TurnStarted,

    /// `action()` returned for the current turn
    TurnCompleted,

    /// `dispose()` returned
    Disposed,

    /// Any engine, hook or cancellation failure
    Faulted { message: String },
}

/// Lifecycle notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    SetupDone,
    ActionDone,
    DisposeDone,
    Error { message: String },
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Nothing follows a terminal notification in the same run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DisposeDone | Self::Error { .. })
    }
}
