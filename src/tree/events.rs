//! Change notifications emitted after successful tree mutations.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::record::LogRecord;

/// A successful mutation of an [`AggregationTree`](super::AggregationTree).
#[derive(Debug, Clone)]
pub enum TreeEvent {
    /// A record was stored under a previously empty key.
    Inserted(Arc<LogRecord>),
    /// A record replaced the path-equal record at its key.
    Replaced(Arc<LogRecord>),
    /// A record was removed.
    Removed(Arc<LogRecord>),
}

impl TreeEvent {
    /// The record the event is about.
    #[must_use]
    pub fn record(&self) -> &Arc<LogRecord> {
        match self {
            Self::Inserted(record) | Self::Replaced(record) | Self::Removed(record) => record,
        }
    }
}

/// Registered listeners. Disconnected receivers are dropped on the next send.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Vec<Sender<TreeEvent>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Receiver<TreeEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub(crate) fn notify(&mut self, event: &TreeEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::record;

    #[test]
    fn test_disconnected_subscribers_are_pruned() {
        let mut subscribers = Subscribers::default();
        let kept = subscribers.subscribe();
        let dropped = subscribers.subscribe();
        drop(dropped);

        let event = TreeEvent::Inserted(Arc::new(record("run1", "cfg", "Seq", 22)));
        subscribers.notify(&event);

        assert_eq!(subscribers.len(), 1);
        let received = kept.try_recv().unwrap();
        assert_eq!(received.record().qp(), "22");
    }
}
