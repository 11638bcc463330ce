use crate::types::EventRecord;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        event: EventRecord,
    ) -> Result<(), broadcast::error::SendError<EventRecord>> {
        self.sender.send(event).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventSource;
    use chrono::Utc;

    fn record(seq: i64) -> EventRecord {
        EventRecord {
            id: format!("evt_{seq}"),
            seq,
            at: Utc::now(),
            correlation_id: None,
            source: EventSource::Cli,
            body: serde_json::json!({ "type": "Test" }),
        }
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(record(1)).unwrap();
        let got = rx.try_recv().unwrap();
        assert_eq!(got.seq, 1);
    }

    #[test]
    fn test_publish_without_subscriber_errors() {
        let bus = EventBus::new(8);
        assert!(bus.publish(record(1)).is_err());
    }
}
