//! In-memory bounded task queue implementing [`TaskQueue`] (spec §4.2's
//! `workflow`/`log`/`sandbox` topics). One instance backs one topic;
//! `moduly-engine`/`moduly-logwriter`/`moduly-sandbox` each hold their
//! own.
//!
//! Mirrors the teacher's `nebula-queue-memory` driver: an
//! `mpsc` channel carries queued items, a `Mutex<HashMap>` tracks
//! in-flight ones for ack/nack, and an `AtomicUsize` tracks queued depth
//! without locking the channel to answer `len()`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moduly_ports::error::{Error, Result};
use moduly_ports::TaskQueue;
use moduly_value::Value;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone)]
struct QueueItem {
    id: String,
    payload: Value,
}

/// In-memory task queue backing one topic.
pub struct MemoryQueue {
    sender: mpsc::Sender<QueueItem>,
    receiver: Arc<Mutex<mpsc::Receiver<QueueItem>>>,
    in_flight: Arc<Mutex<HashMap<String, QueueItem>>>,
    queued_count: AtomicUsize,
}

impl MemoryQueue {
    /// Create a queue bounded at `capacity` buffered items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            queued_count: AtomicUsize::new(0),
        }
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn enqueue(&self, payload: Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let item = QueueItem {
            id: id.clone(),
            payload,
        };
        self.sender
            .try_send(item)
            .map_err(|e| Error::Internal(format!("queue full or closed: {e}")))?;
        self.queued_count.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<(String, Value)>> {
        let mut rx = self.receiver.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(item)) => {
                self.queued_count.fetch_sub(1, Ordering::Relaxed);
                let id = item.id.clone();
                let payload = item.payload.clone();
                self.in_flight.lock().await.insert(id.clone(), item);
                Ok(Some((id, payload)))
            }
            Ok(None) | Err(_) => Ok(None),
        }
    }

    async fn ack(&self, task_id: &str) -> Result<()> {
        self.in_flight
            .lock()
            .await
            .remove(task_id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("Task", task_id))
    }

    async fn nack(&self, task_id: &str) -> Result<()> {
        let Some(item) = self.in_flight.lock().await.remove(task_id) else {
            return Err(Error::not_found("Task", task_id));
        };
        self.sender
            .try_send(item)
            .map_err(|e| Error::Internal(format!("requeue failed: {e}")))?;
        self.queued_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.queued_count.load(Ordering::Relaxed))
    }
}
