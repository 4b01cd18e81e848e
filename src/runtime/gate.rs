//! Cooperative suspension point between turns
//!
//! The worker parks here voluntarily, never while it holds the engine
//! lock. `release` hands over a single permit, and only when somebody is
//! actually parked: permits are never banked, so a resume that arrives
//! while the worker is busy is dropped.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// How the worker left the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateExit {
    Resumed,
    /// The cadence stopped gating before the worker parked
    Ungated,
    Cancelled,
}

#[derive(Debug, Default)]
struct Slot {
    parked: bool,
    permit: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Gate {
    slot: Mutex<Slot>,
    wakeup: Condvar,
}

impl Gate {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until released or cancelled.
    ///
    /// `still_gated` is re-checked under the gate lock: a mode switch that
    /// lands before this point lets the worker through, and one that lands
    /// after it finds the worker parked and resumable.
    ///
    /// `on_parked` runs while the gate lock is held, after the worker is
    /// marked parked, so anything it publishes is already resumable.
    pub(crate) fn park(
        &self,
        cancel: &CancellationToken,
        still_gated: impl FnOnce() -> bool,
        on_parked: impl FnOnce(),
    ) -> GateExit {
        let mut slot = self.lock();
        if cancel.is_cancelled() {
            return GateExit::Cancelled;
        }
        if !still_gated() {
            return GateExit::Ungated;
        }
        slot.parked = true;
        slot.permit = false;
        on_parked();

        while !slot.permit && !cancel.is_cancelled() {
            slot = self
                .wakeup
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let exit = if slot.permit {
            GateExit::Resumed
        } else {
            GateExit::Cancelled
        };
        slot.parked = false;
        slot.permit = false;
        exit
    }

    /// Hand the parked worker its permit. Returns `false` when nobody is parked.
    pub(crate) fn release(&self) -> bool {
        let mut slot = self.lock();
        if !slot.parked || slot.permit {
            return false;
        }
        slot.permit = true;
        self.wakeup.notify_one();
        true
    }

    /// Wake the worker so it re-checks cancellation
    pub(crate) fn wake(&self) {
        let _slot = self.lock();
        self.wakeup.notify_all();
    }

    pub(crate) fn is_parked(&self) -> bool {
        self.lock().parked
    }
}
