//! Subscriber registry and notification fan-out

use super::traits::Subscriber;
use crate::state_machine::Notification;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};

/// The set of subscribers a controller notifies
#[derive(Default)]
pub(crate) struct SubscriberSet {
    subscribers: Mutex<Vec<Arc<dyn Subscriber>>>,
}

impl SubscriberSet {
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Subscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `subscriber`; registering the same one twice is a no-op
    pub(crate) fn add(&self, subscriber: Arc<dyn Subscriber>) -> bool {
        let mut subscribers = self.lock();
        if subscribers.iter().any(|s| Arc::ptr_eq(s, &subscriber)) {
            return false;
        }
        subscribers.push(subscriber);
        true
    }

    /// Unregister `subscriber`; unknown subscribers are ignored
    pub(crate) fn remove(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|s| !Arc::ptr_eq(s, subscriber));
        subscribers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `notification` to a snapshot of the set. Returns how many
    /// subscribers accepted it without panicking.
    pub(crate) fn emit(&self, notification: &Notification) -> usize {
        let snapshot: Vec<Arc<dyn Subscriber>> = self.lock().clone();
        let mut delivered = 0;
        for subscriber in snapshot {
            match catch_unwind(AssertUnwindSafe(|| subscriber.update(notification))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::warn!(
                        notification = ?notification,
                        panic = %panic_message(payload.as_ref()),
                        "Subscriber panicked; continuing with the others"
                    );
                }
            }
        }
        delivered
    }
}

/// Forwards notifications into a bounded tokio mpsc channel.
///
/// A full channel blocks the worker until the receiver catches up, so the
/// receiver sees every notification in order. Once the receiver is dropped
/// notifications are discarded.
///
/// The worker must not be an async runtime thread: there the send cannot
/// block, and a notification that finds the channel full is dropped with
/// a warning.
pub struct ChannelSubscriber {
    tx: mpsc::Sender<Notification>,
}

impl ChannelSubscriber {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn update(&self, notification: &Notification) {
        if Handle::try_current().is_err() {
            // Err only means the receiver is gone
            let _ = self.tx.blocking_send(notification.clone());
            return;
        }
        if let Err(TrySendError::Full(dropped)) = self.tx.try_send(notification.clone()) {
            tracing::warn!(
                notification = ?dropped,
                "Channel subscriber full on an async thread; notification dropped"
            );
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
