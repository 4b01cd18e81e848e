//! Execution controller
//!
//! Owns one engine and one worker thread, steps the engine under the
//! selected cadence and tells subscribers what happened.
//!
//! The external engine is usually process-global: run at most one
//! controller per process unless the binding is known to be re-entrant.

mod error;
mod executor;
mod gate;
mod subscribers;
pub mod traits;


pub use error::{ControllerError, DomainError};
pub use subscribers::ChannelSubscriber;
pub use traits::*;

use crate::config::DriverConfig;
use crate::engine::{Engine, EngineLoader, EnginePath, LoggingEngine};
use crate::state_machine::{transition, CadenceMode, ControllerState, Effect, Event, Notification};
use error::RunError;
use executor::TurnExecutor;
use gate::Gate;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use subscribers::SubscriberSet;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Engine and domain, always locked together
struct Core<D> {
    engine: Option<LoggingEngine<Box<dyn Engine>>>,
    domain: D,
}

/// State shared between the controller handles and the worker
pub(crate) struct Shared<D: TurnProtocol> {
    config: DriverConfig,
    loader: Box<dyn EngineLoader>,
    core: Mutex<Core<D>>,
    mode: AtomicU8,
    state: Mutex<ControllerState>,
    gate: Gate,
    subscribers: SubscriberSet,
    cancel: CancellationToken,
    launched: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    turns: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<D: TurnProtocol> Shared<D> {
    fn lock_core(&self) -> MutexGuard<'_, Core<D>> {
        lock(&self.core)
    }

    fn mode(&self) -> CadenceMode {
        CadenceMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    fn has_done(&self) -> bool {
        self.lock_core().domain.has_done()
    }

    /// Run `f` against the engine and domain under the controller lock
    fn with_engine<R>(
        &self,
        f: impl FnOnce(&mut dyn Engine, &mut D) -> Result<R, DomainError>,
    ) -> Result<R, RunError> {
        let mut core = self.lock_core();
        let Core { engine, domain } = &mut *core;
        let engine = engine.as_mut().ok_or(RunError::EngineMissing)?;
        Ok(f(engine, domain)?)
    }

    /// Feed `event` through the state machine, then execute its effects.
    ///
    /// Callers must not hold the engine lock when the event can notify.
    fn apply(&self, event: Event) {
        let effects = {
            let mut state = lock(&self.state);
            match transition(&state, event) {
                Ok(result) => {
                    tracing::debug!(from = %*state, to = %result.new_state, "State transition");
                    *state = result.new_state;
                    result.effects
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected state transition");
                    return;
                }
            }
        };

        for effect in effects {
            match effect {
                Effect::Notify(notification) => {
                    self.subscribers.emit(&notification);
                }
            }
        }
    }
}

/// Handle to a controller. Clones share the same engine and worker.
pub struct Controller<D: TurnProtocol> {
    shared: Arc<Shared<D>>,
}

impl<D: TurnProtocol> Clone for Controller<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: TurnProtocol> Controller<D> {
    pub fn new(loader: impl EngineLoader + 'static, domain: D, config: DriverConfig) -> Self {
        let mode = config.initial_mode;
        Self {
            shared: Arc::new(Shared {
                config,
                loader: Box::new(loader),
                core: Mutex::new(Core {
                    engine: None,
                    domain,
                }),
                mode: AtomicU8::new(mode.as_u8()),
                state: Mutex::new(ControllerState::New),
                gate: Gate::default(),
                subscribers: SubscriberSet::default(),
                cancel: CancellationToken::new(),
                launched: AtomicBool::new(false),
                worker: Mutex::new(None),
                turns: AtomicU64::new(0),
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Load a fresh engine with the script at `path`.
    ///
    /// May be repeated to replace the engine until the worker launches.
    pub fn start_engine(&self, path: impl Into<EnginePath>) -> Result<(), ControllerError> {
        let path = path.into();
        let mut core = self.shared.lock_core();
        if self.shared.launched.load(Ordering::Acquire) {
            return Err(ControllerError::AlreadyLaunched);
        }

        let engine = self.shared.loader.load(&path)?;
        core.engine = Some(LoggingEngine::new(engine, &path));
        self.shared.apply(Event::EngineLoaded);
        drop(core);

        tracing::info!(script = %path, "CLIPS environment created and ready to run");
        Ok(())
    }

    /// Launch the worker thread and return immediately
    pub fn execute(&self) -> Result<(), ControllerError> {
        self.claim_launch()?;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.config.worker_name.clone())
            .spawn(move || TurnExecutor::new(&shared).run());

        match spawned {
            Ok(handle) => {
                *lock(&self.shared.worker) = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.launched.store(false, Ordering::Release);
                Err(ControllerError::Spawn(e))
            }
        }
    }

    /// Run the whole loop on the calling thread; returns the final state.
    ///
    /// Counts as this controller's single launch, like [`execute`](Self::execute).
    pub fn run_blocking(&self) -> Result<ControllerState, ControllerError> {
        self.claim_launch()?;
        TurnExecutor::new(&self.shared).run();
        Ok(self.state())
    }

    fn claim_launch(&self) -> Result<(), ControllerError> {
        let core = self.shared.lock_core();
        if self.shared.launched.load(Ordering::Acquire) {
            return Err(ControllerError::AlreadyExecuted);
        }
        if core.engine.is_none() {
            return Err(ControllerError::EngineNotStarted);
        }
        self.shared.launched.store(true, Ordering::Release);
        Ok(())
    }

    /// Release the worker from the cadence gate.
    ///
    /// Returns `false`, and does nothing, unless the worker is suspended.
    pub fn resume(&self) -> bool {
        let released = self.shared.gate.release();
        tracing::debug!(released, "Resume requested");
        released
    }

    /// Ask the worker to stop at its next gate evaluation
    pub fn stop(&self) {
        tracing::info!("Stop requested");
        self.shared.cancel.cancel();
        self.shared.gate.wake();
    }

    /// Wait for the worker thread, if one was launched
    pub fn join(&self) -> Result<(), ControllerError> {
        let handle = lock(&self.shared.worker).take();
        match handle {
            Some(handle) => handle.join().map_err(|_| ControllerError::WorkerPanicked),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Cadence
    // ========================================================================

    /// Takes effect at the next gate evaluation
    pub fn set_mode(&self, mode: CadenceMode) {
        let previous = CadenceMode::from_u8(self.shared.mode.swap(mode.as_u8(), Ordering::AcqRel));
        tracing::info!(from = %previous, to = %mode, "Cadence mode changed");
    }

    /// String-tagged variant of [`set_mode`](Self::set_mode); unknown tags are rejected
    pub fn set_mode_str(&self, tag: &str) -> Result<CadenceMode, ControllerError> {
        let mode = tag.parse::<CadenceMode>()?;
        self.set_mode(mode);
        Ok(mode)
    }

    pub fn mode(&self) -> CadenceMode {
        self.shared.mode()
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn state(&self) -> ControllerState {
        lock(&self.shared.state).clone()
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.gate.is_parked()
    }

    /// Turns begun so far
    pub fn turns(&self) -> u64 {
        self.shared.turns.load(Ordering::Acquire)
    }

    /// Facts of the current module, serialized against the worker
    pub fn get_fact_list(&self) -> Result<String, ControllerError> {
        let mut core = self.shared.lock_core();
        let engine = core
            .engine
            .as_mut()
            .ok_or(ControllerError::EngineNotStarted)?;
        Ok(engine.fact_list_text()?)
    }

    /// Agenda in firing order, serialized against the worker
    pub fn get_agenda(&self) -> Result<String, ControllerError> {
        let mut core = self.shared.lock_core();
        let engine = core
            .engine
            .as_mut()
            .ok_or(ControllerError::EngineNotStarted)?;
        Ok(engine.agenda_text()?)
    }

    /// Read the domain's state under the controller lock
    pub fn with_domain<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.shared.lock_core().domain)
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    pub fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) -> bool {
        self.shared.subscribers.add(subscriber)
    }

    pub fn remove_subscriber(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        self.shared.subscribers.remove(subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Subscribe through a bounded channel. The worker waits whenever the
    /// channel is full, so the receiver must keep draining it (or be
    /// dropped) for the run to make progress.
    pub fn subscribe_channel(&self) -> mpsc::Receiver<Notification> {
        let (subscriber, rx) = ChannelSubscriber::channel(self.shared.config.event_capacity);
        self.add_subscriber(Arc::new(subscriber));
        rx
    }
}
