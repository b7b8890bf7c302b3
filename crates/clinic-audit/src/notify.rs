//! Live notifications for appended records

use tokio::sync::broadcast;

use crate::config::DEFAULT_NOTIFY_CAPACITY;
use crate::record::EventRecord;

/// Fan-out of appended records to any number of listeners
///
/// Publishing never blocks and succeeds with no subscribers. A receiver that
/// falls more than `capacity` records behind observes
/// [`broadcast::error::RecvError::Lagged`] and resumes with newer records.
#[derive(Debug, Clone)]
pub struct AuditNotifier {
    tx: broadcast::Sender<EventRecord>,
}

impl AuditNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    /// Send `record` to current subscribers; returns how many received it
    pub fn publish(&self, record: &EventRecord) -> usize {
        self.tx.send(record.clone()).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuditNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::origin::Origin;
    use crate::record::{AuditAction, RecordDraft};

    #[test]
    fn test_publish_without_subscribers() {
        let notifier = AuditNotifier::default();
        let record = RecordDraft::new(AuditAction::Create, "patient").into_record(None, Origin::default());
        assert_eq!(notifier.publish(&record), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_the_record() {
        let notifier = AuditNotifier::new(4);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        let record = RecordDraft::new(AuditAction::Update, "appointment")
            .entity_id("a-1")
            .into_record(None, Origin::default());
        assert_eq!(notifier.publish(&record), 2);

        assert_eq!(first.recv().await.unwrap(), record);
        assert_eq!(second.recv().await.unwrap(), record);
    }
}
