//! Subscriber registry for engine events
//!
//! Each subscriber owns a bounded outbound queue. A subscriber that stops
//! draining either loses its oldest events or is disconnected, depending
//! on the configured drop policy, so a slow consumer never grows memory
//! without bound.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::EngineEvent;

pub type SubscriberId = u64;

/// Drop policy when a subscriber's queue overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Disconnect the lagging subscriber immediately.
    Disconnect,
    /// Drop oldest events to make room for newer ones.
    DropOldest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Maximum queued events per subscriber.
    pub queue_capacity: usize,
    pub drop_policy: DropPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            drop_policy: DropPolicy::Disconnect,
        }
    }
}

#[derive(Debug)]
struct SubscriberQueue {
    events: VecDeque<EngineEvent>,
    dropped: u64,
}

/// Registry of feed subscribers and their pending events
#[derive(Debug)]
pub struct MatchFeed {
    queues: BTreeMap<SubscriberId, SubscriberQueue>,
    next_id: SubscriberId,
    config: FeedConfig,
    total_disconnects: u64,
}

impl MatchFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            queues: BTreeMap::new(),
            next_id: 1,
            config,
            total_disconnects: 0,
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.queues.insert(
            id,
            SubscriberQueue {
                events: VecDeque::with_capacity(self.config.queue_capacity.min(64)),
                dropped: 0,
            },
        );
        debug!(subscriber_id = id, "Registered feed subscriber");
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let removed = self.queues.remove(&id).is_some();
        if removed {
            debug!(subscriber_id = id, "Removed feed subscriber");
        }
        removed
    }

    /// Queue `event` for every subscriber
    ///
    /// Returns the subscribers disconnected for lagging.
    pub fn publish(&mut self, event: &EngineEvent) -> Vec<SubscriberId> {
        let capacity = self.config.queue_capacity;
        let mut to_disconnect = Vec::new();

        for (id, queue) in self.queues.iter_mut() {
            if queue.events.len() >= capacity {
                match self.config.drop_policy {
                    DropPolicy::Disconnect => {
                        to_disconnect.push(*id);
                        continue;
                    }
                    DropPolicy::DropOldest => {
                        queue.events.pop_front();
                        queue.dropped += 1;
                    }
                }
            }
            queue.events.push_back(event.clone());
        }

        for id in &to_disconnect {
            self.queues.remove(id);
            self.total_disconnects += 1;
            warn!(
                subscriber_id = *id,
                event_type = event.event_type_label(),
                total_disconnects = self.total_disconnects,
                "Feed backpressure: disconnecting lagging subscriber"
            );
        }

        to_disconnect
    }

    /// Take every pending event for a subscriber, oldest first
    pub fn drain(&mut self, id: SubscriberId) -> Vec<EngineEvent> {
        self.queues
            .get_mut(&id)
            .map(|q| q.events.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.queues.contains_key(&id)
    }

    /// Get queue depth for a specific subscriber.
    pub fn queue_depth(&self, id: SubscriberId) -> usize {
        self.queues.get(&id).map(|q| q.events.len()).unwrap_or(0)
    }

    /// Events dropped for a subscriber under `DropOldest`
    pub fn dropped(&self, id: SubscriberId) -> u64 {
        self.queues.get(&id).map(|q| q.dropped).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.queues.len()
    }

    pub fn total_disconnects(&self) -> u64 {
        self.total_disconnects
    }
}

impl Default for MatchFeed {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}
