//! Inference engine facade
//!
//! A narrow, synchronous view of a CLIPS-style production system. The
//! controller only ever talks to the engine through [`Engine`], so the
//! native binding, a subprocess or a test double are interchangeable.
//!
//! Calls are blocking and must be serialized by the caller; no
//! implementation here does its own locking.

mod error;
pub mod process;

pub use error::{EngineError, EngineErrorKind};
pub use process::{ProcessEngine, ProcessLoader};

use std::fmt;
use std::path::Path;
use std::time::Instant;

/// Operations the controller needs from an inference engine
pub trait Engine: Send {
    /// Return the engine to its post-load initial state
    fn reset(&mut self) -> Result<(), EngineError>;

    /// Fire rules until the agenda is empty; returns the number of firings
    fn run(&mut self) -> Result<u64, EngineError>;

    /// Fire at most one rule; returns 0 when the agenda was already empty
    fn step(&mut self) -> Result<u64, EngineError>;

    /// Text rendering of the current module's facts
    fn fact_list_text(&mut self) -> Result<String, EngineError>;

    /// Text rendering of the agenda, highest salience first
    fn agenda_text(&mut self) -> Result<String, EngineError>;
}

impl<T: Engine + ?Sized> Engine for Box<T> {
    fn reset(&mut self) -> Result<(), EngineError> {
        (**self).reset()
    }

    fn run(&mut self) -> Result<u64, EngineError> {
        (**self).run()
    }

    fn step(&mut self) -> Result<u64, EngineError> {
        (**self).step()
    }

    fn fact_list_text(&mut self) -> Result<String, EngineError> {
        (**self).fact_list_text()
    }

    fn agenda_text(&mut self) -> Result<String, EngineError> {
        (**self).agenda_text()
    }
}

/// Builds a fresh engine with a rule script loaded
pub trait EngineLoader: Send + Sync {
    fn load(&self, path: &EnginePath) -> Result<Box<dyn Engine>, EngineError>;
}

impl<F> EngineLoader for F
where
    F: Fn(&EnginePath) -> Result<Box<dyn Engine>, EngineError> + Send + Sync,
{
    fn load(&self, path: &EnginePath) -> Result<Box<dyn Engine>, EngineError> {
        self(path)
    }
}

/// Opaque reference to a rule script. Only the loader decides whether it is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnginePath(String);

impl EnginePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for EnginePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnginePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for EnginePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl From<&Path> for EnginePath {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// Logging wrapper for engines
pub struct LoggingEngine<E: Engine> {
    inner: E,
    script: String,
}

impl<E: Engine> LoggingEngine<E> {
    pub fn new(inner: E, script: &EnginePath) -> Self {
        Self {
            inner,
            script: script.to_string(),
        }
    }

    fn observe<T>(
        &mut self,
        op: &'static str,
        call: impl FnOnce(&mut E) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let start = Instant::now();
        let result = call(&mut self.inner);
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::debug!(
                    script = %self.script,
                    op,
                    duration_ms = %duration.as_millis(),
                    "Engine call completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    script = %self.script,
                    op,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    fatal = e.kind.is_fatal(),
                    "Engine call failed"
                );
            }
        }

        result
    }
}

impl<E: Engine> Engine for LoggingEngine<E> {
    fn reset(&mut self) -> Result<(), EngineError> {
        self.observe("reset", Engine::reset)
    }

    fn run(&mut self) -> Result<u64, EngineError> {
        let fired = self.observe("run", Engine::run)?;
        tracing::debug!(script = %self.script, fired, "Engine reached quiescence");
        Ok(fired)
    }

    fn step(&mut self) -> Result<u64, EngineError> {
        self.observe("step", Engine::step)
    }

    fn fact_list_text(&mut self) -> Result<String, EngineError> {
        self.observe("facts", Engine::fact_list_text)
    }

    fn agenda_text(&mut self) -> Result<String, EngineError> {
        self.observe("agenda", Engine::agenda_text)
    }
}
