//! Bus error model.
//!
//! - [`BusError`] values travel through the acknowledgment channel; they are
//!   never returned from `post`.
//! - [`RegistrationError`] is returned synchronously by `register`.
//! - [`DispatchError`] is what a dispatcher reports when it fails to handle an envelope.
//! - [`StoreError`] is what a message store reports when it cannot persist a batch.

use thiserror::Error;

use keel_core::{Message, MessageClass, MessageId};

use crate::envelope::Envelope;

/// Failure acknowledged for a single posted message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The message is empty or was rejected by a bus filter.
    #[error("invalid message {message_class} ({message_id}): {reason}")]
    InvalidMessage {
        message_id: MessageId,
        message_class: MessageClass,
        reason: String,
    },

    /// A dispatcher failed while handling the message.
    #[error("dispatcher `{dispatcher}` failed on {message_class} ({message_id}): {reason}")]
    Dispatch {
        message_id: MessageId,
        message_class: MessageClass,
        dispatcher: String,
        reason: String,
    },

    /// No dispatcher is registered for the message class (dead letter).
    #[error("no dispatcher found for {message_class} ({message_id})")]
    NoDispatcherFound {
        message_id: MessageId,
        message_class: MessageClass,
    },

    /// The batch containing the message could not be stored.
    #[error("failed to store {message_class} ({message_id}): {reason}")]
    Store {
        message_id: MessageId,
        message_class: MessageClass,
        reason: String,
    },
}

impl BusError {
    pub fn invalid_message<M: Message>(message: &M, reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message_id: message.id(),
            message_class: message.message_class(),
            reason: reason.into(),
        }
    }

    pub fn dispatch<M>(envelope: &Envelope<M>, dispatcher: &str, error: &DispatchError) -> Self {
        Self::Dispatch {
            message_id: envelope.message_id(),
            message_class: envelope.message_class().clone(),
            dispatcher: dispatcher.to_string(),
            reason: error.to_string(),
        }
    }

    pub fn no_dispatcher<M>(envelope: &Envelope<M>) -> Self {
        Self::NoDispatcherFound {
            message_id: envelope.message_id(),
            message_class: envelope.message_class().clone(),
        }
    }

    pub fn store<M: Message>(message: &M, error: &StoreError) -> Self {
        Self::Store {
            message_id: message.id(),
            message_class: message.message_class(),
            reason: error.to_string(),
        }
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            Self::InvalidMessage { message_id, .. }
            | Self::Dispatch { message_id, .. }
            | Self::NoDispatcherFound { message_id, .. }
            | Self::Store { message_id, .. } => *message_id,
        }
    }

    pub fn message_class(&self) -> &MessageClass {
        match self {
            Self::InvalidMessage { message_class, .. }
            | Self::Dispatch { message_class, .. }
            | Self::NoDispatcherFound { message_class, .. }
            | Self::Store { message_class, .. } => message_class,
        }
    }
}

/// Registration precondition failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("dispatcher `{0}` exposes no message classes")]
    EmptyMessageClasses(String),

    /// Unicast registries accept a single dispatcher per class.
    #[error("{message_class} is already handled by dispatcher `{existing}`")]
    AlreadyHandled {
        message_class: MessageClass,
        existing: String,
    },

    #[error("dispatcher registry lock poisoned")]
    Poisoned,
}

/// A dispatcher failed to handle an envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DispatchError(String);

impl DispatchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Message store failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("message store lock poisoned")]
    Poisoned,

    #[error("message store unavailable: {0}")]
    Unavailable(String),
}
