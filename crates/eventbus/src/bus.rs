//! An in-memory, per-topic broadcast [`EventBus`] driver (spec §4.2: "a
//! per-run pub/sub channel the gateway's SSE handler reads without
//! polling the store").
//!
//! Topics are created lazily on first publish or subscribe and never
//! removed automatically: a run's topic is small (one
//! `broadcast::Sender` plus its ring buffer) and the gateway is expected
//! to drop its subscription once a terminal event arrives, so leaving
//! finished topics in the registry until the process restarts is
//! cheaper than coordinating their removal with every subscriber.

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_ports::error::Result;
use moduly_ports::eventbus::{EventBus, Subscription};
use moduly_value::Value;
use tokio::sync::broadcast;

/// Ring buffer capacity per topic: generous enough to hold a burst of
/// `node_start`/`node_finish` pairs for a wide graph without a slow
/// subscriber lagging mid-run.
const CHANNEL_CAPACITY: usize = 256;

/// In-process broadcast implementation of the [`EventBus`] port.
#[derive(Debug, Default)]
pub struct BroadcastEventBus {
    topics: DashMap<String, broadcast::Sender<Value>>,
}

impl BroadcastEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<Value> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Number of topics with at least one registered sender, for tests
    /// and diagnostics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    async fn publish(&self, topic: &str, event: Value) -> Result<()> {
        let sender = self.sender_for(topic);
        // No subscribers is not an error: delivery is best-effort.
        let _ = sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let sender = self.sender_for(topic);
        Ok(Subscription::new(sender.subscribe()))
    }
}
