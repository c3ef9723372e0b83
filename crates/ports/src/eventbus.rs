//! Event pub/sub port.
//!
//! Topic `run:{run_id}` carries one event per state transition (spec
//! §4.2). Publishers are the engine (`node_start`/`node_finish`/
//! `workflow_start`/`workflow_finish`/`error`); subscribers are the
//! gateway's SSE handler and, internally, anything that wants to
//! observe a run without polling the store.

use std::time::Duration;

use async_trait::async_trait;
use moduly_value::Value;
use tokio::sync::broadcast;

use crate::error::Result;

/// A live subscription to one topic.
///
/// Wraps a [`broadcast::Receiver`] rather than a boxed `Stream` trait
/// object: every [`EventBus`] driver in this workspace is the same
/// in-memory broadcast channel (per-run fan-out has no reason to be
/// pluggable the way storage or the task queue do), so there is
/// nothing for an associated-type abstraction to buy.
pub struct Subscription {
    receiver: broadcast::Receiver<Value>,
}

impl Subscription {
    /// Wrap a broadcast receiver as a [`Subscription`].
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<Value>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event, or `None` if `idle_timeout` elapses
    /// with nothing published, or `None` if the publisher side has
    /// been dropped and every buffered event has been drained.
    ///
    /// Events missed due to a slow subscriber lagging the broadcast
    /// channel's buffer (`broadcast::error::RecvError::Lagged`) are
    /// skipped rather than surfaced as an error: the gateway's SSE
    /// relay cares about forward progress toward a terminal event, not
    /// about replaying every intermediate `node_start`.
    pub async fn recv(&mut self, idle_timeout: Duration) -> Option<Value> {
        loop {
            match tokio::time::timeout(idle_timeout, self.receiver.recv()).await {
                Ok(Ok(event)) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
            }
        }
    }
}

/// Port trait for publishing and subscribing to per-run event topics.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic. Delivery is best-effort: a topic
    /// with no subscribers silently drops the event, matching
    /// `tokio::sync::broadcast`'s semantics.
    async fn publish(&self, topic: &str, event: Value) -> Result<()>;

    /// Subscribe to a topic, receiving only events published after
    /// this call returns.
    async fn subscribe(&self, topic: &str) -> Result<Subscription>;
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn EventBus) {}
