//! Bus filters: per-message admission checks run before storage and dispatch.

use keel_core::{Message, MessageKind};

use crate::error::BusError;

/// Admission check for posted messages.
///
/// A rejected message is acknowledged with the returned error and is neither
/// stored nor dispatched; the rest of the batch continues.
pub trait BusFilter<M: Message>: Send + Sync {
    fn accept(&self, message: &M) -> Result<(), BusError>;
}

impl<M, F> BusFilter<M> for F
where
    M: Message,
    F: Fn(&M) -> Result<(), BusError> + Send + Sync,
{
    fn accept(&self, message: &M) -> Result<(), BusError> {
        self(message)
    }
}

/// Rejects empty (default-valued) messages.
#[derive(Debug, Copy, Clone, Default)]
pub struct RejectEmpty;

impl<M: Message> BusFilter<M> for RejectEmpty {
    fn accept(&self, message: &M) -> Result<(), BusError> {
        if message.is_empty() {
            return Err(BusError::invalid_message(message, "message is empty"));
        }
        Ok(())
    }
}

/// Admits only messages of the given kinds.
#[derive(Debug, Clone)]
pub struct KindFilter {
    allowed: Vec<MessageKind>,
}

impl KindFilter {
    pub fn new(allowed: impl IntoIterator<Item = MessageKind>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl<M: Message> BusFilter<M> for KindFilter {
    fn accept(&self, message: &M) -> Result<(), BusError> {
        let kind = message.kind();
        if self.allowed.contains(&kind) {
            Ok(())
        } else {
            Err(BusError::invalid_message(
                message,
                format!("{kind:?} messages are not accepted by this bus"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{MessageClass, MessageId};

    #[derive(Debug, Clone, Default)]
    struct Memo {
        id: MessageId,
        text: String,
    }

    impl Message for Memo {
        fn message_class(&self) -> MessageClass {
            MessageClass::new("test.Memo")
        }

        fn id(&self) -> MessageId {
            self.id
        }

        fn kind(&self) -> MessageKind {
            MessageKind::Event
        }

        fn is_empty(&self) -> bool {
            self.text.is_empty()
        }
    }

    #[test]
    fn reject_empty_names_the_message() {
        let memo = Memo::default();
        let err = RejectEmpty.accept(&memo).unwrap_err();
        assert_eq!(err.message_id(), memo.id);
        assert!(matches!(err, BusError::InvalidMessage { .. }));

        let full = Memo {
            text: "hi".into(),
            ..Memo::default()
        };
        assert!(RejectEmpty.accept(&full).is_ok());
    }

    #[test]
    fn kind_filter_admits_listed_kinds_only() {
        let memo = Memo {
            text: "hi".into(),
            ..Memo::default()
        };
        assert!(KindFilter::new([MessageKind::Event]).accept(&memo).is_ok());
        assert!(KindFilter::new([MessageKind::Command]).accept(&memo).is_err());
    }

    #[test]
    fn closures_are_filters() {
        let only_short = |m: &Memo| {
            if m.text.len() > 3 {
                Err(BusError::invalid_message(m, "too long"))
            } else {
                Ok(())
            }
        };
        let memo = Memo {
            text: "long text".into(),
            ..Memo::default()
        };
        assert!(only_short.accept(&memo).is_err());
    }
}
