//! Trait seams between the controller, the problem domain and the views
//!
//! The controller is pure mechanism; everything domain-specific comes in
//! through [`TurnProtocol`] and everything presentation-specific goes out
//! through [`Subscriber`].

use super::DomainError;
use crate::engine::Engine;
use crate::state_machine::Notification;

/// Per-domain policy the controller drives turn by turn.
///
/// Every hook runs on the worker while the controller holds the engine
/// lock, so hooks may call into `engine` freely and never race
/// `get_fact_list`/`get_agenda`.
pub trait TurnProtocol: Send + 'static {
    /// One-time initialization, called right after the engine is reset
    fn setup(&mut self, engine: &mut dyn Engine) -> Result<(), DomainError>;

    /// Post-processing after every engine advance
    fn action(&mut self, engine: &mut dyn Engine) -> Result<(), DomainError>;

    /// Whether execution should stop. Must not change without an
    /// intervening `setup` or `action`.
    fn has_done(&self) -> bool;

    /// One-time finalization once `has_done` first holds. Never called
    /// after a failure.
    fn dispose(&mut self, engine: &mut dyn Engine) -> Result<(), DomainError>;
}

/// Receives lifecycle notifications
///
/// Called synchronously on the worker thread; a slow subscriber slows the
/// run. A panicking subscriber is isolated from the others.
pub trait Subscriber: Send + Sync {
    fn update(&self, notification: &Notification);
}

impl<F> Subscriber for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn update(&self, notification: &Notification) {
        self(notification);
    }
}
