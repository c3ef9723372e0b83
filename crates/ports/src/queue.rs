//! Task queue port.
//!
//! Defines the interface for the three topical queues of spec §4.2:
//! `workflow` (engine tasks), `log` (persistence tasks), and `sandbox`
//! (out-of-band ingestion). One [`TaskQueue`] instance backs one topic;
//! a driver typically exposes three, one per topic name.

use std::time::Duration;

use async_trait::async_trait;
use moduly_value::Value;

use crate::error::Result;

/// At-least-once work queue interface for distributing tasks to workers.
///
/// - [`enqueue`](Self::enqueue) adds a task and returns its id.
/// - [`dequeue`](Self::dequeue) retrieves the next task, blocking up to
///   `timeout` before returning `None`.
/// - [`ack`](Self::ack) confirms successful processing.
/// - [`nack`](Self::nack) requeues a task for retry with backoff left
///   to the driver.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task payload. Returns an opaque task id.
    async fn enqueue(&self, payload: Value) -> Result<String>;

    /// Dequeue the next available task, or `None` if `timeout` elapses
    /// with nothing available.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<(String, Value)>>;

    /// Acknowledge successful processing of a dequeued task.
    async fn ack(&self, task_id: &str) -> Result<()>;

    /// Negative-acknowledge a task, requeuing it for retry.
    async fn nack(&self, task_id: &str) -> Result<()>;

    /// Number of tasks currently queued (not counting in-flight ones).
    async fn len(&self) -> Result<usize>;

    /// Whether the queue is empty. Default implementation calls
    /// [`len`](Self::len).
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn TaskQueue) {}
