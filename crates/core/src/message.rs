//! Message abstraction: the unit posted to a bus.
//!
//! Messages are **immutable facts or intents**. A bus never mutates a message;
//! it wraps it into an envelope, hands the envelope to dispatchers and reports
//! the outcome back to the poster.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::MessageId;

/// Stable type key of a message, used for dispatcher lookups.
///
/// Equality and hashing are by name only, so two classes built from the same
/// name are interchangeable (e.g. one built from a `&'static str`, one parsed
/// from configuration).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageClass(Cow<'static, str>);

impl MessageClass {
    /// Class from a static name (e.g. `"inventory.CreateItem"`).
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Class from a runtime name. Empty names are rejected.
    pub fn parse(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("message class name must not be empty"));
        }
        Ok(Self(Cow::Owned(name)))
    }

    /// Class keyed by the Rust type name of `T`.
    ///
    /// `type_name` is not guaranteed unique and may change between compiler
    /// releases, so use this only for classes that live within one process.
    /// Classes that are persisted or sent over the wire should be named with
    /// [`MessageClass::new`].
    pub fn of<T: ?Sized>() -> Self {
        Self(Cow::Borrowed(core::any::type_name::<T>()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MessageClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The declared kind of a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Command,
    Event,
    Rejection,
    /// A plain record (e.g. an entity state posted for import).
    Record,
}

/// Reference to the message that caused another message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    pub message_id: MessageId,
    pub message_class: MessageClass,
}

impl Origin {
    pub fn new(message_id: MessageId, message_class: MessageClass) -> Self {
        Self {
            message_id,
            message_class,
        }
    }

    /// Origin pointing at `message`.
    pub fn of<M: Message>(message: &M) -> Self {
        Self::new(message.id(), message.message_class())
    }
}

/// A message of one bus family (commands, events, rejections, ...).
///
/// Implementations are usually enums covering every message a bounded context
/// defines, with `message_class()` returning a distinct class per variant.
///
/// ## Design Constraints
///
/// Messages must be:
/// - **Cloneable**: the bus keeps the original for storage and acknowledgment
/// - **Send + Sync**: messages cross thread boundaries
/// - **'static**: messages own all their data
pub trait Message: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Routing key of this message.
    fn message_class(&self) -> MessageClass;

    /// Identity of this message.
    fn id(&self) -> MessageId;

    fn kind(&self) -> MessageKind {
        MessageKind::Record
    }

    /// The message that caused this one, if any.
    fn origin(&self) -> Option<Origin> {
        None
    }

    /// Whether the message carries no data (default-valued).
    ///
    /// Empty messages are rejected by the bus before dispatch.
    fn is_empty(&self) -> bool {
        false
    }
}
