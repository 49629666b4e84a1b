//! Domain event stream
//!
//! Every grant, revocation, warning and lifecycle change is published on a
//! single broadcast channel. Emitting with no subscribers is not an error.

use reactrole_types::{EventEnvelope, ReactRoleEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// Publishes engine events to any number of subscribers
#[derive(Clone)]
pub struct EventAggregator {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventAggregator {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Emit an event
    pub fn emit(&self, event: ReactRoleEvent) {
        let envelope = EventEnvelope::new(event);
        debug!(
            event_id = %envelope.id,
            severity = ?envelope.severity,
            "Emitting event"
        );
        // No subscribers is fine
        let _ = self.tx.send(envelope);
    }
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactrole_types::{EventSeverity, MessageId};

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let events = EventAggregator::new(8);
        let mut rx = events.subscribe();
        assert_eq!(events.subscriber_count(), 1);

        events.emit(ReactRoleEvent::AllReactionsCleared {
            message: MessageId::new(1),
            roles: vec![],
            members: vec![],
            count: 0,
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.severity, EventSeverity::Info);
        assert!(matches!(
            envelope.event,
            ReactRoleEvent::AllReactionsCleared { count: 0, .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let events = EventAggregator::default();
        events.emit(ReactRoleEvent::Ready { bindings: 0 });
        assert_eq!(events.subscriber_count(), 0);
    }
}
