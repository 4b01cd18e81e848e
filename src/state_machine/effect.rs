//! Effects produced by state transitions

use super::event::Notification;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver a notification to every subscriber
    Notify(Notification),
}

impl Effect {
    pub fn notify_setup_done() -> Self {
        Effect::Notify(Notification::SetupDone)
    }

    pub fn notify_action_done() -> Self {
        Effect::Notify(Notification::ActionDone)
    }

    pub fn notify_dispose_done() -> Self {
        Effect::Notify(Notification::DisposeDone)
    }

    pub fn notify_error(message: impl Into<String>) -> Self {
        Effect::Notify(Notification::error(message))
    }
}
