//! Acknowledgment channel between a bus and the poster.
//!
//! The transport layer supplies the observer; the bus treats it as an opaque
//! three-callback sink:
//!
//! - `on_next(message)`: the message was accepted and handled without errors
//! - `on_error(error)`: the message failed (validation, dispatch, storage, dead letter)
//! - `on_completed()`: the **whole batch** was error-free
//!
//! Acknowledgments for one `post` call arrive in input order.

use crate::error::BusError;

/// Receives acknowledgments for posted messages.
pub trait AckObserver<M> {
    fn on_next(&mut self, message: M);

    fn on_error(&mut self, error: BusError);

    fn on_completed(&mut self);
}

impl<M, O> AckObserver<M> for &mut O
where
    O: AckObserver<M> + ?Sized,
{
    fn on_next(&mut self, message: M) {
        (**self).on_next(message)
    }

    fn on_error(&mut self, error: BusError) {
        (**self).on_error(error)
    }

    fn on_completed(&mut self) {
        (**self).on_completed()
    }
}

/// Observer that remembers everything it receives.
///
/// Useful in tests and in synchronous callers that want to inspect the
/// outcome of a post after it returns.
#[derive(Debug, Clone)]
pub struct MemoizingObserver<M> {
    acknowledged: Vec<M>,
    errors: Vec<BusError>,
    completions: usize,
}

impl<M> MemoizingObserver<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages passed to `on_next`, in arrival order.
    pub fn acknowledged(&self) -> &[M] {
        &self.acknowledged
    }

    /// Errors passed to `on_error`, in arrival order.
    pub fn errors(&self) -> &[BusError] {
        &self.errors
    }

    /// How many times `on_completed` was called.
    pub fn completions(&self) -> usize {
        self.completions
    }

    pub fn is_completed(&self) -> bool {
        self.completions > 0
    }

    pub fn first_error(&self) -> Option<&BusError> {
        self.errors.first()
    }
}

impl<M> Default for MemoizingObserver<M> {
    fn default() -> Self {
        Self {
            acknowledged: Vec::new(),
            errors: Vec::new(),
            completions: 0,
        }
    }
}

impl<M> AckObserver<M> for MemoizingObserver<M> {
    fn on_next(&mut self, message: M) {
        self.acknowledged.push(message);
    }

    fn on_error(&mut self, error: BusError) {
        self.errors.push(error);
    }

    fn on_completed(&mut self) {
        self.completions += 1;
    }
}

/// Forwards to an inner observer while counting errors.
///
/// The bus wraps the poster's observer in one of these for the duration of
/// a batch to decide which messages get `on_next` and whether the batch completes.
pub(crate) struct ErrorCounter<'a, M> {
    inner: &'a mut dyn AckObserver<M>,
    errors: usize,
}

impl<'a, M> ErrorCounter<'a, M> {
    pub(crate) fn new(inner: &'a mut dyn AckObserver<M>) -> Self {
        Self { inner, errors: 0 }
    }

    pub(crate) fn errors(&self) -> usize {
        self.errors
    }
}

impl<M> AckObserver<M> for ErrorCounter<'_, M> {
    fn on_next(&mut self, message: M) {
        self.inner.on_next(message);
    }

    fn on_error(&mut self, error: BusError) {
        self.errors += 1;
        self.inner.on_error(error);
    }

    fn on_completed(&mut self) {
        self.inner.on_completed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{MessageClass, MessageId};

    fn some_error() -> BusError {
        BusError::NoDispatcherFound {
            message_id: MessageId::new(),
            message_class: MessageClass::new("test.Ping"),
        }
    }

    #[test]
    fn counter_counts_errors_and_forwards_everything() {
        let mut memo = MemoizingObserver::<u32>::new();
        {
            let mut counter = ErrorCounter::new(&mut memo);
            counter.on_next(1);
            counter.on_error(some_error());
            counter.on_error(some_error());
            counter.on_completed();
            assert_eq!(counter.errors(), 2);
        }

        assert_eq!(memo.acknowledged(), &[1]);
        assert_eq!(memo.errors().len(), 2);
        assert_eq!(memo.completions(), 1);
    }
}
