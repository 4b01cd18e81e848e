//! Worker loop
//!
//! reset → setup → (gate → advance → action)* → dispose, with every
//! failure folded into a single `ERROR` notification.

use super::error::RunError;
use super::gate::GateExit;
use super::subscribers::panic_message;
use super::traits::TurnProtocol;
use super::Shared;
use crate::state_machine::{CadenceMode, Event};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::time::Instant;
use uuid::Uuid;

/// Drives one run of a controller. Not restartable.
pub(super) struct TurnExecutor<'a, D: TurnProtocol> {
    shared: &'a Shared<D>,
    run_id: Uuid,
}

impl<'a, D: TurnProtocol> TurnExecutor<'a, D> {
    pub(super) fn new(shared: &'a Shared<D>) -> Self {
        Self {
            shared,
            run_id: Uuid::new_v4(),
        }
    }

    pub(super) fn run(self) {
        let span = tracing::info_span!("run", run_id = %self.run_id);
        let _enter = span.enter();
        let start = Instant::now();
        tracing::info!(mode = %self.shared.mode(), "Starting execution");

        let result = match catch_unwind(AssertUnwindSafe(|| self.drive())) {
            Ok(result) => result,
            Err(payload) => Err(RunError::Panicked(panic_message(payload.as_ref()))),
        };

        let turns = self.shared.turns.load(Ordering::Acquire);
        let duration_ms = start.elapsed().as_millis();
        match result {
            Ok(()) => {
                tracing::info!(turns, duration_ms = %duration_ms, "Execution finished");
            }
            Err(e) => {
                tracing::error!(turns, duration_ms = %duration_ms, error = %e, "Execution failed");
                self.shared.apply(Event::Faulted {
                    message: e.to_string(),
                });
            }
        }
    }

    fn drive(&self) -> Result<(), RunError> {
        self.shared.with_engine(|engine, domain| {
            engine.reset()?;
            domain.setup(engine)
        })?;
        self.shared.apply(Event::SetupCompleted);

        while !self.shared.has_done() {
            let mode = self.pass_gate()?;
            self.shared.apply(Event::TurnStarted);
            let turn = self.shared.turns.fetch_add(1, Ordering::AcqRel) + 1;

            let fired = self.shared.with_engine(|engine, domain| {
                let fired = if mode.is_single_step() {
                    engine.step()?
                } else {
                    engine.run()?
                };
                domain.action(engine)?;
                Ok(fired)
            })?;

            tracing::debug!(turn, mode = %mode, fired, "Turn completed");
            self.shared.apply(Event::TurnCompleted);
        }

        self.shared.with_engine(|engine, domain| domain.dispose(engine))?;
        self.shared.apply(Event::Disposed);
        Ok(())
    }

    /// The only suspension point. Returns the mode the coming turn runs under.
    fn pass_gate(&self) -> Result<CadenceMode, RunError> {
        let cancel = &self.shared.cancel;
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let mode = self.shared.mode();
        if !mode.is_gated() {
            return Ok(mode);
        }

        tracing::debug!(mode = %mode, "Suspending until resumed");
        let exit = self.shared.gate.park(
            cancel,
            || self.shared.mode().is_gated(),
            || self.shared.apply(Event::GateParked),
        );
        match exit {
            // A mode switched while parked applies to this turn's advance
            GateExit::Resumed | GateExit::Ungated => Ok(self.shared.mode()),
            GateExit::Cancelled => Err(RunError::Cancelled),
        }
    }
}
