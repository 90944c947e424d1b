use std::collections::{BTreeSet, HashSet};

use keel_core::{Message, MessageClass};

use crate::envelope::Envelope;
use crate::error::DispatchError;

/// Identifier of something an envelope was delivered to (an entity, a subscriber, a remote node).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TargetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The targets one dispatch reached.
pub type DispatchTargets = BTreeSet<TargetId>;

/// Handles envelopes of one or more message classes (dispatcher abstraction).
///
/// A dispatcher is the only thing a bus knows about a handler. Handler discovery
/// (which object handles which class, and how) happens when the dispatcher is
/// built, not when messages flow:
///
/// - **Local handlers**: in-process code reacting to a message (see [`FnDispatcher`])
/// - **Forwarding adapters**: hand the envelope to another process or thread
///   (see [`crate::ChannelDispatcher`])
///
/// ## Contract
///
/// - `message_classes()` must be non-empty; registration fails otherwise.
/// - `dispatch()` reports failure through its `Result`; the bus turns an error into
///   an acknowledgment error for that message and keeps processing the batch.
/// - `on_error()` is notified after a failed `dispatch()`, before the poster is.
pub trait Dispatcher<M: Message>: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Classes of messages this dispatcher handles.
    fn message_classes(&self) -> HashSet<MessageClass>;

    /// Deliver an envelope, returning what it was delivered to.
    fn dispatch(&self, envelope: &Envelope<M>) -> Result<DispatchTargets, DispatchError>;

    fn on_error(&self, _envelope: &Envelope<M>, _error: &DispatchError) {}
}

/// Closure-backed dispatcher for in-process handlers.
pub struct FnDispatcher<M, F> {
    name: String,
    classes: HashSet<MessageClass>,
    handler: F,
    _message: core::marker::PhantomData<fn(M)>,
}

impl<M, F> FnDispatcher<M, F>
where
    M: Message,
    F: Fn(&Envelope<M>) -> Result<DispatchTargets, DispatchError> + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        classes: impl IntoIterator<Item = MessageClass>,
        handler: F,
    ) -> Self {
        Self {
            name: name.into(),
            classes: classes.into_iter().collect(),
            handler,
            _message: core::marker::PhantomData,
        }
    }
}

impl<M, F> core::fmt::Debug for FnDispatcher<M, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnDispatcher")
            .field("name", &self.name)
            .field("classes", &self.classes)
            .finish_non_exhaustive()
    }
}

impl<M, F> Dispatcher<M> for FnDispatcher<M, F>
where
    M: Message,
    F: Fn(&Envelope<M>) -> Result<DispatchTargets, DispatchError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn message_classes(&self) -> HashSet<MessageClass> {
        self.classes.clone()
    }

    fn dispatch(&self, envelope: &Envelope<M>) -> Result<DispatchTargets, DispatchError> {
        (self.handler)(envelope)
    }
}
