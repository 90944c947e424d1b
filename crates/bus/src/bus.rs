//! The posting algorithm shared by every bus.
//!
//! ## Posting Flow
//!
//! ```text
//! post_all(messages, observer)
//!   ↓
//! 1. filter      – rejected messages are acknowledged with `on_error`
//!   ↓
//! 2. store       – the original accepted messages, once per batch
//!   ↓
//! 3. to_envelope – one envelope per accepted message, input order kept
//!   ↓
//! 4. do_post     – registry lookup, then each dispatcher in registration order
//!   │              └─ no dispatcher → handle_dead_message
//!   ↓
//! 5. on_next(message) for each message that produced no new error
//!   ↓
//! 6. on_completed() iff the whole batch produced no error
//! ```
//!
//! Everything runs synchronously on the calling thread. Concurrent `post` calls
//! are not serialized against each other; per-entity single-writer discipline
//! belongs to the layer above.
//!
//! Concrete buses ([`crate::CommandBus`], [`crate::EventBus`]) differ only in
//! their hooks; they share state through [`BusCore`].

use std::sync::Arc;

use tracing::{debug, warn};

use keel_core::Message;

use crate::ack::{AckObserver, ErrorCounter};
use crate::config::{BusConfig, DeadLetterPolicy};
use crate::dispatcher::Dispatcher;
use crate::envelope::Envelope;
use crate::error::{BusError, RegistrationError, StoreError};
use crate::filter::{BusFilter, RejectEmpty};
use crate::registry::{DispatcherRegistry, RegistryMode};
use crate::store::MessageStore;

/// A message bus for one message family.
///
/// Implementors supply the hooks (`registry`, `filter`, `store`,
/// `handle_dead_message`, optionally `to_envelope`); the posting algorithm
/// (`post`, `post_all`, `do_post`) is provided and should not be overridden.
///
/// ## Failure Semantics
///
/// Nothing is returned from `post`: validation, storage and dispatch failures
/// are acknowledged per message through the observer and never abort the rest
/// of the batch. Only registration reports errors synchronously.
pub trait Bus: Send + Sync {
    type Message: Message;

    /// Registry owned by this bus, built when the bus is constructed.
    fn registry(&self) -> &DispatcherRegistry<Self::Message>;

    /// Admit or reject each message; rejected ones must be reported to `observer`.
    ///
    /// Returns the accepted messages in input order.
    fn filter(
        &self,
        messages: Vec<Self::Message>,
        observer: &mut dyn AckObserver<Self::Message>,
    ) -> Vec<Self::Message>;

    /// Persist the accepted messages of one batch.
    fn store(&self, messages: &[Self::Message]) -> Result<(), StoreError>;

    /// Dead-letter policy for envelopes nobody is registered for.
    fn handle_dead_message(
        &self,
        envelope: &Envelope<Self::Message>,
        observer: &mut dyn AckObserver<Self::Message>,
    );

    fn to_envelope(&self, message: Self::Message) -> Envelope<Self::Message> {
        Envelope::new(message)
    }

    /// Post a single message.
    ///
    /// An empty message is acknowledged with `BusError::InvalidMessage` and
    /// goes no further.
    fn post(&self, message: Self::Message, observer: &mut dyn AckObserver<Self::Message>) {
        if message.is_empty() {
            debug!(message_class = %message.message_class(), message_id = %message.id(), "empty message rejected");
            observer.on_error(BusError::invalid_message(&message, "message is empty"));
            return;
        }
        self.post_all(vec![message], observer);
    }

    /// Post a batch of messages; acknowledgments arrive in input order.
    fn post_all(
        &self,
        messages: Vec<Self::Message>,
        observer: &mut dyn AckObserver<Self::Message>,
    ) {
        let total = messages.len();
        let mut counter = ErrorCounter::new(observer);

        let accepted = self.filter(messages, &mut counter);

        if !accepted.is_empty() {
            match self.store(&accepted) {
                Err(error) => {
                    warn!(error = %error, messages = accepted.len(), "storing batch failed; batch not dispatched");
                    for message in &accepted {
                        counter.on_error(BusError::store(message, &error));
                    }
                }
                Ok(()) => {
                    let envelopes: Vec<_> = accepted
                        .into_iter()
                        .map(|message| self.to_envelope(message))
                        .collect();

                    for envelope in envelopes {
                        let errors_before = counter.errors();
                        self.do_post(&envelope, &mut counter);
                        if counter.errors() == errors_before {
                            counter.on_next(envelope.into_message());
                        }
                    }
                }
            }
        }

        let errors = counter.errors();
        if errors == 0 {
            counter.on_completed();
        }
        debug!(messages = total, errors, "batch posted");
    }

    /// Dispatch one envelope to every dispatcher registered for its class.
    ///
    /// Dispatcher failures are reported to the dispatcher's `on_error` and then
    /// to `observer`; remaining dispatchers still receive the envelope.
    fn do_post(
        &self,
        envelope: &Envelope<Self::Message>,
        observer: &mut dyn AckObserver<Self::Message>,
    ) {
        let dispatchers = self.registry().dispatchers_for(envelope.message_class());
        if dispatchers.is_empty() {
            self.handle_dead_message(envelope, observer);
            return;
        }

        for dispatcher in dispatchers {
            match dispatcher.dispatch(envelope) {
                Ok(targets) => {
                    debug!(
                        message_class = %envelope.message_class(),
                        message_id = %envelope.message_id(),
                        dispatcher = dispatcher.name(),
                        targets = targets.len(),
                        "envelope dispatched"
                    );
                }
                Err(error) => {
                    warn!(
                        message_class = %envelope.message_class(),
                        message_id = %envelope.message_id(),
                        dispatcher = dispatcher.name(),
                        error = %error,
                        "dispatch failed"
                    );
                    dispatcher.on_error(envelope, &error);
                    observer.on_error(BusError::dispatch(envelope, dispatcher.name(), &error));
                }
            }
        }
    }

    fn register(&self, dispatcher: Arc<dyn Dispatcher<Self::Message>>) -> Result<(), RegistrationError> {
        self.registry().register(dispatcher)
    }

    fn unregister(&self, dispatcher: &Arc<dyn Dispatcher<Self::Message>>) -> bool {
        self.registry().unregister(dispatcher)
    }

    /// Shut the bus down: every registration is dropped.
    fn close(&self) {
        self.registry().clear();
        debug!("bus closed");
    }
}

/// State and hook implementations shared by the concrete buses.
pub struct BusCore<M: Message, S> {
    registry: DispatcherRegistry<M>,
    store: S,
    filters: Vec<Box<dyn BusFilter<M>>>,
    config: BusConfig,
}

impl<M, S> BusCore<M, S>
where
    M: Message,
    S: MessageStore<M>,
{
    /// Build the core; the empty-message filter is installed first when enabled.
    pub fn new(mode: RegistryMode, store: S, config: BusConfig) -> Self {
        let mut filters: Vec<Box<dyn BusFilter<M>>> = Vec::new();
        if config.reject_empty {
            filters.push(Box::new(RejectEmpty));
        }
        Self {
            registry: DispatcherRegistry::new(mode),
            store,
            filters,
            config,
        }
    }

    /// Append a filter; filters run in the order they were added.
    pub fn add_filter(&mut self, filter: impl BusFilter<M> + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn registry(&self) -> &DispatcherRegistry<M> {
        &self.registry
    }

    pub fn message_store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Run every filter over every message; the first rejection wins.
    pub fn run_filters(&self, messages: Vec<M>, observer: &mut dyn AckObserver<M>) -> Vec<M> {
        messages
            .into_iter()
            .filter(|message| {
                match self.filters.iter().try_for_each(|f| f.accept(message)) {
                    Ok(()) => true,
                    Err(error) => {
                        debug!(message_class = %message.message_class(), message_id = %message.id(), error = %error, "message filtered out");
                        observer.on_error(error);
                        false
                    }
                }
            })
            .collect()
    }

    pub fn store_batch(&self, messages: &[M]) -> Result<(), StoreError> {
        self.store.store(messages)
    }

    /// Apply the configured dead-letter policy.
    pub fn dead_letter(&self, envelope: &Envelope<M>, observer: &mut dyn AckObserver<M>) {
        match self.config.dead_letter {
            DeadLetterPolicy::Reject => {
                warn!(message_class = %envelope.message_class(), message_id = %envelope.message_id(), "no dispatcher found; message rejected");
                observer.on_error(BusError::no_dispatcher(envelope));
            }
            DeadLetterPolicy::Drop => {
                warn!(message_class = %envelope.message_class(), message_id = %envelope.message_id(), "no dispatcher found; message dropped");
            }
        }
    }
}

impl<M: Message, S> core::fmt::Debug for BusCore<M, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusCore")
            .field("registry", &self.registry)
            .field("filters", &self.filters.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
