//! Controller state types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Cadence
// ============================================================================

/// How aggressively turns proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CadenceMode {
    /// Never self-suspend; every turn runs the engine to quiescence
    Run = 0,
    /// Suspend before every turn; every turn fires exactly one rule
    RunOne = 1,
    /// Suspend before every turn; every turn runs the engine to quiescence
    #[default]
    Step = 2,
}

impl CadenceMode {
    pub const ALL: [CadenceMode; 3] = [CadenceMode::Run, CadenceMode::RunOne, CadenceMode::Step];

    /// Whether the worker parks at the gate before a turn
    pub fn is_gated(self) -> bool {
        matches!(self, Self::RunOne | Self::Step)
    }

    /// Whether a turn fires a single rule instead of running to quiescence
    pub fn is_single_step(self) -> bool {
        matches!(self, Self::RunOne)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Run => "RUN",
            Self::RunOne => "RUN_ONE",
            Self::Step => "STEP",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Run,
            1 => Self::RunOne,
            _ => Self::Step,
        }
    }
}

impl fmt::Display for CadenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode tag that is none of `RUN`, `RUN_ONE`, `RUNONE` or `STEP`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cadence mode: {0:?} (expected RUN, RUN_ONE or STEP)")]
pub struct UnknownMode(pub String);

impl FromStr for CadenceMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RUN" => Ok(Self::Run),
            // RUNONE is the historical tag
            "RUN_ONE" | "RUNONE" => Ok(Self::RunOne),
            "STEP" => Ok(Self::Step),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

// ============================================================================
// Controller State
// ============================================================================

/// Lifecycle of one controller instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerState {
    /// No engine yet
    #[default]
    New,

    /// Engine loaded, worker not past setup
    Started,

    /// `setup()` returned, no turn begun yet
    SetupDone,

    /// Parked at the cadence gate waiting for `resume()`
    Suspended,

    /// Inside a turn, or between turns in free-run
    RunningTurn,

    /// `dispose()` returned; the run is over
    Disposed,

    /// Run aborted; absorbing
    Failed { message: String },
}

impl ControllerState {
    /// No event can leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed | Self::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Started => "started",
            Self::SetupDone => "setup_done",
            Self::Suspended => "suspended",
            Self::RunningTurn => "running_turn",
            Self::Disposed => "disposed",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { message } => write!(f, "failed: {message}"),
            other => f.write_str(other.name()),
        }
    }
}
