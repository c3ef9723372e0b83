//! In-memory [`Lease`] driver: a TTL-bounded named lock (spec §5,
//! "Document-level processing takes a TTL-bounded named lock"), modeled
//! directly on `apps/shared/distributed_lock.py`'s acquire/renew/release
//! shape.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moduly_ports::error::Result;
use moduly_ports::Lease;
use parking_lot::Mutex;
use std::collections::HashMap;

struct Holder {
    holder: String,
    expires_at: DateTime<Utc>,
}

/// In-memory TTL-bounded named lock, shared by the execution engine and
/// the retrieval KB-sync path.
#[derive(Default)]
pub struct MemoryLease {
    leases: Mutex<HashMap<String, Holder>>,
}

impl MemoryLease {
    /// Create an empty lease table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_expired(entry: &Holder, now: DateTime<Utc>) -> bool {
        entry.expires_at <= now
    }
}

#[async_trait]
impl Lease for MemoryLease {
    async fn acquire(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now();
        let mut leases = self.leases.lock();
        let acquired = match leases.get(name) {
            Some(entry) if entry.holder == holder || Self::is_expired(entry, now) => true,
            Some(_) => false,
            None => true,
        };
        if acquired {
            leases.insert(
                name.to_string(),
                Holder {
                    holder: holder.to_string(),
                    expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
                },
            );
        }
        Ok(acquired)
    }

    async fn renew(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now();
        let mut leases = self.leases.lock();
        match leases.get_mut(name) {
            Some(entry) if entry.holder == holder && !Self::is_expired(entry, now) => {
                entry.expires_at = now + chrono::Duration::from_std(ttl).unwrap_or_default();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, name: &str, holder: &str) -> Result<bool> {
        let mut leases = self.leases.lock();
        match leases.get(name) {
            Some(entry) if entry.holder == holder => {
                leases.remove(name);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_acquire_succeeds() {
        let lease = MemoryLease::new();
        assert!(lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn second_holder_cannot_acquire_while_held() {
        let lease = MemoryLease::new();
        lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap();
        assert!(!lease.acquire("doc:1", "worker-b", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn same_holder_can_reacquire() {
        let lease = MemoryLease::new();
        lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap();
        assert!(lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_can_be_stolen() {
        let lease = MemoryLease::new();
        lease.acquire("doc:1", "worker-a", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(lease.acquire("doc:1", "worker-b", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn release_by_wrong_holder_fails() {
        let lease = MemoryLease::new();
        lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap();
        assert!(!lease.release("doc:1", "worker-b").await.unwrap());
    }

    #[tokio::test]
    async fn release_frees_the_name_for_anyone() {
        let lease = MemoryLease::new();
        lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap();
        assert!(lease.release("doc:1", "worker-a").await.unwrap());
        assert!(lease.acquire("doc:1", "worker-b", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn renew_extends_only_for_current_holder() {
        let lease = MemoryLease::new();
        lease.acquire("doc:1", "worker-a", Duration::from_secs(60)).await.unwrap();
        assert!(lease.renew("doc:1", "worker-a", Duration::from_secs(120)).await.unwrap());
        assert!(!lease.renew("doc:1", "worker-b", Duration::from_secs(120)).await.unwrap());
    }
}
