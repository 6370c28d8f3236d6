use crate::{
    error::{EventBusError, Result},
    event::{DomainEvent, Event},
    subscriber::{Subscription, TopicPattern},
};
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of undelivered events buffered per subscriber
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast event bus; cloning shares the same channel
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Stamp and broadcast an event.
    ///
    /// Publishing with no subscribers is not an error; the event is dropped.
    pub fn publish(&self, event: DomainEvent) -> Result<Event> {
        if event.topic.is_empty() || event.topic.contains('*') {
            return Err(EventBusError::InvalidTopic(event.topic));
        }

        let event = event.into_event();
        let delivered = self.sender.send(event.clone()).unwrap_or(0);
        debug!(
            event_id = %event.id,
            topic = %event.topic,
            subscribers = delivered,
            "Published event"
        );
        Ok(event)
    }

    pub fn subscribe(&self, pattern: &str) -> Result<Subscription> {
        let pattern = TopicPattern::parse(pattern)?;
        Ok(Subscription::new(self.sender.subscribe(), pattern))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
