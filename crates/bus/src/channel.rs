//! Forwarding dispatcher: hands envelopes to subscribers over channels.
//!
//! This is the **remote-forwarding** flavour of a dispatcher. The bus sees an
//! ordinary dispatcher; the envelopes land in subscriptions drained by other
//! threads (workers, transport adapters, projections running elsewhere).
//!
//! Delivery is at-least-once from the poster's point of view: a successful
//! dispatch means every live subscription received a copy, not that the
//! copies were processed.

use std::collections::HashSet;
use std::sync::{Mutex, mpsc};
use std::time::Duration;

use keel_core::{Message, MessageClass};

use crate::dispatcher::{DispatchTargets, Dispatcher, TargetId};
use crate::envelope::Envelope;
use crate::error::DispatchError;

/// A subscription to forwarded envelopes.
///
/// ## Usage Pattern
///
/// ```ignore
/// let forwarder = Arc::new(ChannelDispatcher::new("outbox", classes));
/// let subscription = forwarder.subscribe();
/// bus.register(forwarder.clone())?;
///
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(envelope) => handle(envelope)?,
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,  // Check for shutdown
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,  // Forwarder dropped
///     }
/// }
/// ```
///
/// Subscriptions are designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Block until the next item is available.
    pub fn recv(&self) -> Result<T, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an item without blocking.
    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for an item.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Dispatcher that broadcasts envelopes to channel subscriptions.
#[derive(Debug)]
pub struct ChannelDispatcher<M> {
    name: String,
    classes: HashSet<MessageClass>,
    subscribers: Mutex<Vec<mpsc::Sender<Envelope<M>>>>,
}

impl<M> ChannelDispatcher<M> {
    pub fn new(name: impl Into<String>, classes: impl IntoIterator<Item = MessageClass>) -> Self {
        Self {
            name: name.into(),
            classes: classes.into_iter().collect(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription<Envelope<M>> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M: Message> Dispatcher<M> for ChannelDispatcher<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn message_classes(&self) -> HashSet<MessageClass> {
        self.classes.clone()
    }

    fn dispatch(&self, envelope: &Envelope<M>) -> Result<DispatchTargets, DispatchError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| DispatchError::new("subscriber list lock poisoned"))?;

        // Drop any dead subscribers while forwarding.
        subs.retain(|tx| tx.send(envelope.clone()).is_ok());

        if subs.is_empty() {
            return Err(DispatchError::new(format!(
                "`{}` has no live subscribers",
                self.name
            )));
        }

        Ok((0..subs.len())
            .map(|i| TargetId::new(format!("{}#{i}", self.name)))
            .collect())
    }
}
