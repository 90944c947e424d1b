//! Event bus: multicast routing of events and rejections.
//!
//! - any number of dispatchers per class
//! - admits `MessageKind::Event` and `MessageKind::Rejection`
//! - default dead-letter policy is `Drop`: an event nobody listens to is not a failure

use keel_core::{Message, MessageKind};

use crate::ack::AckObserver;
use crate::bus::{Bus, BusCore};
use crate::config::BusConfig;
use crate::envelope::Envelope;
use crate::error::StoreError;
use crate::filter::{BusFilter, KindFilter};
use crate::registry::{DispatcherRegistry, RegistryMode};
use crate::store::{InMemoryMessageStore, MessageStore};

#[derive(Debug)]
pub struct EventBus<M: Message, S = InMemoryMessageStore<M>> {
    core: BusCore<M, S>,
}

impl<M, S> EventBus<M, S>
where
    M: Message,
    S: MessageStore<M>,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, BusConfig::for_events())
    }

    pub fn with_config(store: S, config: BusConfig) -> Self {
        let mut core = BusCore::new(RegistryMode::Multicast, store, config);
        core.add_filter(KindFilter::new([MessageKind::Event, MessageKind::Rejection]));
        Self { core }
    }

    /// Build with `BusConfig::for_events()` overridden from the environment.
    pub fn from_env(store: S) -> Self {
        Self::with_config(store, BusConfig::from_env(BusConfig::for_events()))
    }

    pub fn with_filter(mut self, filter: impl BusFilter<M> + 'static) -> Self {
        self.core.add_filter(filter);
        self
    }

    pub fn message_store(&self) -> &S {
        self.core.message_store()
    }

    pub fn config(&self) -> &BusConfig {
        self.core.config()
    }
}

impl<M> Default for EventBus<M, InMemoryMessageStore<M>>
where
    M: Message,
{
    fn default() -> Self {
        Self::new(InMemoryMessageStore::new())
    }
}

impl<M, S> Bus for EventBus<M, S>
where
    M: Message,
    S: MessageStore<M>,
{
    type Message = M;

    fn registry(&self) -> &DispatcherRegistry<M> {
        self.core.registry()
    }

    fn filter(&self, messages: Vec<M>, observer: &mut dyn AckObserver<M>) -> Vec<M> {
        self.core.run_filters(messages, observer)
    }

    fn store(&self, messages: &[M]) -> Result<(), StoreError> {
        self.core.store_batch(messages)
    }

    fn handle_dead_message(&self, envelope: &Envelope<M>, observer: &mut dyn AckObserver<M>) {
        self.core.dead_letter(envelope, observer);
    }
}
