use crate::{
    error::{EventBusError, Result},
    event::Event,
};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// Parsed subscription pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    segments: Vec<String>,
}

impl TopicPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() || pattern.split('.').any(str::is_empty) {
            return Err(EventBusError::InvalidPattern(pattern.to_string()));
        }
        Ok(Self {
            segments: pattern.split('.').map(str::to_string).collect(),
        })
    }

    pub fn matches(&self, topic: &str) -> bool {
        let topic_segments: Vec<&str> = topic.split('.').collect();
        let last = self.segments.len().saturating_sub(1);

        for (index, segment) in self.segments.iter().enumerate() {
            let Some(candidate) = topic_segments.get(index) else {
                return false;
            };
            if segment == "*" {
                if index == last {
                    return true;
                }
                continue;
            }
            if segment != candidate {
                return false;
            }
        }

        topic_segments.len() == self.segments.len()
    }
}

/// Receiving half of a topic subscription
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    pattern: TopicPattern,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<Event>, pattern: TopicPattern) -> Self {
        Self { receiver, pattern }
    }

    /// Wait for the next matching event; `None` once the bus is dropped
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.pattern.matches(&event.topic) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Event subscriber lagged; events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event that is already queued, without waiting
    pub fn try_next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.pattern.matches(&event.topic) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Event subscriber lagged; events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Every matching event currently queued
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
