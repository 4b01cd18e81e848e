//! Driver configuration

use crate::state_machine::CadenceMode;
use std::path::PathBuf;

/// Default capacity of each channel subscription
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

/// Default name of the worker thread
pub const DEFAULT_WORKER_NAME: &str = "clips-driver";

/// Configuration for a controller and its engine loader
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Cadence the controller starts in
    pub initial_mode: CadenceMode,
    /// Explicit `clips` executable; looked up on `PATH` when unset
    pub clips_binary: Option<PathBuf>,
    /// Capacity of each channel subscription
    pub event_capacity: usize,
    /// Worker thread name
    pub worker_name: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            initial_mode: CadenceMode::default(),
            clips_binary: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl DriverConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; invalid values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let initial_mode = match lookup("CLIPS_DRIVER_MODE") {
            Some(tag) => tag.parse::<CadenceMode>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring CLIPS_DRIVER_MODE");
                defaults.initial_mode
            }),
            None => defaults.initial_mode,
        };

        let event_capacity = match lookup("CLIPS_DRIVER_EVENT_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(value = %raw, "Ignoring CLIPS_DRIVER_EVENT_CAPACITY");
                    defaults.event_capacity
                }
            },
            None => defaults.event_capacity,
        };

        Self {
            initial_mode,
            clips_binary: lookup("CLIPS_BINARY")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            event_capacity,
            worker_name: lookup("CLIPS_DRIVER_WORKER_NAME")
                .filter(|n| !n.is_empty())
                .unwrap_or(defaults.worker_name),
        }
    }
}
