//! Message class → dispatchers mapping.
//!
//! The registry is the only long-lived shared mutable structure of a bus.
//! Lookups take a read lock and return an owned snapshot, so a reader never
//! observes a half-updated dispatcher set for a class. Concurrent
//! register/unregister calls for the same dispatcher are last-writer-wins.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use keel_core::{Message, MessageClass};

use crate::dispatcher::Dispatcher;
use crate::error::RegistrationError;

/// How many dispatchers a single message class may have.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegistryMode {
    /// Any number of dispatchers per class (events, rejections).
    Multicast,
    /// At most one dispatcher per class (commands).
    Unicast,
}

/// Registry of dispatchers keyed by message class.
pub struct DispatcherRegistry<M: Message> {
    mode: RegistryMode,
    dispatchers: RwLock<HashMap<MessageClass, Vec<Arc<dyn Dispatcher<M>>>>>,
}

/// Dispatcher identity is the identity of the shared allocation.
fn same_dispatcher<M: Message>(a: &Arc<dyn Dispatcher<M>>, b: &Arc<dyn Dispatcher<M>>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl<M: Message> DispatcherRegistry<M> {
    pub fn new(mode: RegistryMode) -> Self {
        Self {
            mode,
            dispatchers: RwLock::new(HashMap::new()),
        }
    }

    pub fn multicast() -> Self {
        Self::new(RegistryMode::Multicast)
    }

    pub fn unicast() -> Self {
        Self::new(RegistryMode::Unicast)
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    /// Register `dispatcher` under every class it advertises.
    ///
    /// Fails without touching the registry if the dispatcher advertises no
    /// classes, or (unicast only) if another dispatcher already handles one of them.
    /// Registering the same dispatcher twice is a no-op.
    pub fn register(&self, dispatcher: Arc<dyn Dispatcher<M>>) -> Result<(), RegistrationError> {
        let classes = dispatcher.message_classes();
        if classes.is_empty() {
            return Err(RegistrationError::EmptyMessageClasses(
                dispatcher.name().to_string(),
            ));
        }

        let mut map = self
            .dispatchers
            .write()
            .map_err(|_| RegistrationError::Poisoned)?;

        if self.mode == RegistryMode::Unicast {
            for class in &classes {
                let taken_by = map
                    .get(class)
                    .and_then(|ds| ds.iter().find(|d| !same_dispatcher(d, &dispatcher)));
                if let Some(existing) = taken_by {
                    return Err(RegistrationError::AlreadyHandled {
                        message_class: class.clone(),
                        existing: existing.name().to_string(),
                    });
                }
            }
        }

        for class in classes {
            let set = map.entry(class).or_default();
            if !set.iter().any(|d| same_dispatcher(d, &dispatcher)) {
                set.push(dispatcher.clone());
            }
        }

        debug!(dispatcher = dispatcher.name(), "dispatcher registered");
        Ok(())
    }

    /// Remove `dispatcher` from every class it is registered under.
    ///
    /// Returns `true` if anything was removed.
    pub fn unregister(&self, dispatcher: &Arc<dyn Dispatcher<M>>) -> bool {
        let mut map = match self.dispatchers.write() {
            Ok(m) => m,
            Err(_) => {
                warn!(dispatcher = dispatcher.name(), "registry lock poisoned; unregister skipped");
                return false;
            }
        };

        let mut removed = false;
        map.retain(|_class, set| {
            let before = set.len();
            set.retain(|d| !same_dispatcher(d, dispatcher));
            removed |= set.len() != before;
            !set.is_empty()
        });

        if removed {
            debug!(dispatcher = dispatcher.name(), "dispatcher unregistered");
        }
        removed
    }

    /// Snapshot of the dispatchers registered for `class` (empty if none).
    pub fn dispatchers_for(&self, class: &MessageClass) -> Vec<Arc<dyn Dispatcher<M>>> {
        match self.dispatchers.read() {
            Ok(map) => map.get(class).cloned().unwrap_or_default(),
            Err(_) => {
                warn!(message_class = %class, "registry lock poisoned; no dispatchers returned");
                vec![]
            }
        }
    }

    pub fn is_registered(&self, class: &MessageClass) -> bool {
        self.dispatchers
            .read()
            .map(|map| map.contains_key(class))
            .unwrap_or(false)
    }

    /// Classes that currently have at least one dispatcher.
    pub fn registered_classes(&self) -> HashSet<MessageClass> {
        self.dispatchers
            .read()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every registration (bus shutdown).
    pub fn clear(&self) {
        match self.dispatchers.write() {
            Ok(mut map) => map.clear(),
            // Shutdown must not leave dispatchers behind, even after a panic elsewhere.
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl<M: Message> Default for DispatcherRegistry<M> {
    fn default() -> Self {
        Self::multicast()
    }
}

impl<M: Message> core::fmt::Debug for DispatcherRegistry<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatcherRegistry")
            .field("mode", &self.mode)
            .field("classes", &self.registered_classes())
            .finish()
    }
}
