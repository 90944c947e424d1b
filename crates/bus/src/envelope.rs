use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keel_core::{Message, MessageClass, MessageId, MessageKind, Origin};

/// Envelope for a posted message, containing routing metadata.
///
/// This is the unit handed to dispatchers.
///
/// Notes:
/// - `message_class`, `kind` and `origin` are **denormalized** from the message at
///   construction so that routing never has to inspect the payload again.
/// - The envelope belongs to the bus for the duration of one `post` call;
///   dispatchers only ever see it by shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    envelope_id: Uuid,
    message_id: MessageId,
    message_class: MessageClass,
    kind: MessageKind,
    origin: Option<Origin>,

    /// When the bus accepted the message.
    posted_at: DateTime<Utc>,

    message: M,
}

impl<M: Message> Envelope<M> {
    pub fn new(message: M) -> Self {
        Self::with_posted_at(message, Utc::now())
    }

    /// Wrap `message` with an explicit acceptance time (deterministic tests).
    pub fn with_posted_at(message: M, posted_at: DateTime<Utc>) -> Self {
        Self {
            envelope_id: Uuid::now_v7(),
            message_id: message.id(),
            message_class: message.message_class(),
            kind: message.kind(),
            origin: message.origin(),
            posted_at,
            message,
        }
    }
}

impl<M> Envelope<M> {
    pub fn envelope_id(&self) -> Uuid {
        self.envelope_id
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn message_class(&self) -> &MessageClass {
        &self.message_class
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn into_message(self) -> M {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct ItemRenamed {
        id: MessageId,
        cause: MessageId,
        name: String,
    }

    impl Message for ItemRenamed {
        fn message_class(&self) -> MessageClass {
            MessageClass::new("inventory.ItemRenamed")
        }

        fn id(&self) -> MessageId {
            self.id
        }

        fn kind(&self) -> MessageKind {
            MessageKind::Event
        }

        fn origin(&self) -> Option<Origin> {
            Some(Origin::new(self.cause, MessageClass::new("inventory.RenameItem")))
        }
    }

    #[test]
    fn routing_fields_are_denormalized_from_message() {
        let event = ItemRenamed {
            id: MessageId::new(),
            cause: MessageId::new(),
            name: "bolt".to_string(),
        };
        let env = Envelope::new(event.clone());

        assert_eq!(env.message_id(), event.id);
        assert_eq!(env.message_class(), &MessageClass::new("inventory.ItemRenamed"));
        assert_eq!(env.kind(), MessageKind::Event);
        assert_eq!(env.origin().map(|o| o.message_id), Some(event.cause));
        assert_eq!(env.into_message(), event);
    }

    #[test]
    fn each_envelope_gets_its_own_id() {
        let event = ItemRenamed {
            id: MessageId::new(),
            cause: MessageId::new(),
            name: "nut".to_string(),
        };
        let first = Envelope::new(event.clone());
        let second = Envelope::new(event);
        assert_ne!(first.envelope_id(), second.envelope_id());
        assert_eq!(first.message_id(), second.message_id());
    }
}
