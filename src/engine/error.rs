//! Engine error types

use thiserror::Error;

/// Failure reported by the inference engine or its transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Load, message)
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Command, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Io, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Protocol, message)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Script could not be loaded; the engine was never ready
    Load,
    /// The engine rejected or failed a command
    Command,
    /// Transport to the engine broke (pipe closed, process died)
    Io,
    /// The engine answered with something the facade cannot interpret
    Protocol,
}

impl EngineErrorKind {
    /// Whether the engine handle is still usable after this error
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Io | Self::Protocol)
    }
}
