//! Storage hook for accepted messages.
//!
//! A bus stores the **original** accepted messages before converting them to
//! envelopes and dispatching. Stores are for audit and replay; the bus itself
//! keeps no durable queue.

use std::sync::{Arc, RwLock};

use crate::error::StoreError;

/// Persists accepted messages of one bus.
pub trait MessageStore<M>: Send + Sync {
    fn store(&self, messages: &[M]) -> Result<(), StoreError>;
}

impl<M, S> MessageStore<M> for Arc<S>
where
    S: MessageStore<M> + ?Sized,
{
    fn store(&self, messages: &[M]) -> Result<(), StoreError> {
        (**self).store(messages)
    }
}

/// In-memory append-only message store for tests/dev.
#[derive(Debug)]
pub struct InMemoryMessageStore<M> {
    messages: RwLock<Vec<M>>,
}

impl<M> InMemoryMessageStore<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: Clone> InMemoryMessageStore<M> {
    /// Snapshot of everything stored so far, in arrival order.
    pub fn messages(&self) -> Vec<M> {
        match self.messages.read() {
            Ok(m) => m.clone(),
            Err(_) => vec![],
        }
    }
}

impl<M> Default for InMemoryMessageStore<M> {
    fn default() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
        }
    }
}

impl<M> MessageStore<M> for InMemoryMessageStore<M>
where
    M: Clone + Send + Sync,
{
    fn store(&self, messages: &[M]) -> Result<(), StoreError> {
        let mut stored = self.messages.write().map_err(|_| StoreError::Poisoned)?;
        stored.extend_from_slice(messages);
        Ok(())
    }
}
