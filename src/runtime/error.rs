//! Controller and domain error types

use crate::engine::EngineError;
use crate::state_machine::UnknownMode;
use thiserror::Error;

/// Failure raised by a turn-protocol hook
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Failed(String),
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Misuse of the controller, reported synchronously to the caller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Engine not started: call start_engine first")]
    EngineNotStarted,
    #[error("Controller already executed; create a new controller for another run")]
    AlreadyExecuted,
    #[error("Engine cannot be replaced once the worker has launched")]
    AlreadyLaunched,
    #[error(transparent)]
    UnknownMode(#[from] UnknownMode),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Worker thread panicked")]
    WorkerPanicked,
}

/// Why a run ended without `dispose()`
#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("execution cancelled")]
    Cancelled,
    #[error("engine not started")]
    EngineMissing,
    #[error("panic during execution: {0}")]
    Panicked(String),
}
