//! Priority bucket (spec §4.3): one MLFQ level's per-tenant FIFO
//! queues plus a round-robin cursor over the tenants currently
//! holding jobs in this level.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;

use crate::queued::QueuedJob;

const DEFAULT_TENANT: &str = "__default__";

struct Inner {
    queues: HashMap<String, VecDeque<QueuedJob>>,
    tenant_order: Vec<String>,
    cursor: usize,
    last_activity: HashMap<String, Instant>,
}

/// One priority level's fair, per-tenant job queue.
pub struct PriorityBucket {
    inner: Mutex<Inner>,
}

impl PriorityBucket {
    /// Build an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queues: HashMap::new(),
                tenant_order: Vec::new(),
                cursor: 0,
                last_activity: HashMap::new(),
            }),
        }
    }

    fn tenant_key(tenant_id: &str) -> &str {
        if tenant_id.is_empty() {
            DEFAULT_TENANT
        } else {
            tenant_id
        }
    }

    /// Append a job to its tenant's FIFO, registering the tenant in
    /// the round-robin order if it was not already present.
    pub fn push(&self, job: QueuedJob) {
        let tenant = Self::tenant_key(&job.job.tenant_id).to_string();
        let mut inner = self.inner.lock();
        if inner.queues.get(&tenant).is_none_or(VecDeque::is_empty) && !inner.tenant_order.contains(&tenant) {
            inner.tenant_order.push(tenant.clone());
        }
        inner.last_activity.insert(tenant.clone(), Instant::now());
        inner.queues.entry(tenant).or_default().push_back(job);
    }

    /// Advance the round-robin cursor and pop the oldest job belonging
    /// to the next tenant whose in-flight count is below `cap`.
    ///
    /// `in_flight` reports a tenant's current concurrently-running job
    /// count; tenants at `cap` are skipped (and keep their place in
    /// the order) rather than blocking the whole bucket.
    pub fn pop_next_ready(&self, cap: usize, in_flight: impl Fn(&str) -> usize) -> Option<QueuedJob> {
        let mut inner = self.inner.lock();
        let tenant_count = inner.tenant_order.len();
        for _ in 0..tenant_count {
            if inner.tenant_order.is_empty() {
                break;
            }
            if inner.cursor >= inner.tenant_order.len() {
                inner.cursor = 0;
            }
            let tenant = inner.tenant_order[inner.cursor].clone();
            inner.cursor = (inner.cursor + 1) % inner.tenant_order.len().max(1);

            if in_flight(&tenant) >= cap {
                continue;
            }

            let Some(queue) = inner.queues.get_mut(&tenant) else { continue };
            let Some(job) = queue.pop_front() else { continue };
            if queue.is_empty() {
                inner.queues.remove(&tenant);
                if let Some(pos) = inner.tenant_order.iter().position(|t| t == &tenant) {
                    inner.tenant_order.remove(pos);
                    if inner.cursor > pos {
                        inner.cursor -= 1;
                    }
                }
            }
            return Some(job);
        }
        None
    }

    /// Remove and return every job older than `threshold` (measured
    /// from original arrival), for the aging tick to promote.
    pub fn drain_aged(&self, threshold: std::time::Duration) -> Vec<QueuedJob> {
        let mut inner = self.inner.lock();
        let mut aged = Vec::new();
        let tenants: Vec<String> = inner.queues.keys().cloned().collect();
        for tenant in tenants {
            let Some(queue) = inner.queues.get_mut(&tenant) else { continue };
            let mut kept = VecDeque::with_capacity(queue.len());
            while let Some(job) = queue.pop_front() {
                if job.enqueued_at.elapsed() >= threshold {
                    aged.push(job);
                } else {
                    kept.push_back(job);
                }
            }
            if kept.is_empty() {
                inner.queues.remove(&tenant);
                if let Some(pos) = inner.tenant_order.iter().position(|t| t == &tenant) {
                    inner.tenant_order.remove(pos);
                    if inner.cursor > pos {
                        inner.cursor -= 1;
                    }
                }
            } else {
                *queue = kept;
            }
        }
        aged
    }

    /// Total jobs waiting across every tenant in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().queues.values().map(VecDeque::len).sum()
    }

    /// `true` when the bucket holds no jobs for any tenant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct tenants currently holding jobs in this bucket.
    #[must_use]
    pub fn active_tenants(&self) -> usize {
        self.inner.lock().tenant_order.len()
    }

    /// Drop tenants whose queues have been empty for longer than
    /// `idle_timeout` — cleanup only, since an empty queue already
    /// leaves the round-robin order immediately.
    pub fn cleanup_idle(&self, idle_timeout: std::time::Duration) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let stale: Vec<String> = inner
            .last_activity
            .iter()
            .filter(|(tenant, last)| !inner.queues.contains_key(*tenant) && now.duration_since(**last) > idle_timeout)
            .map(|(tenant, _)| tenant.clone())
            .collect();
        for tenant in stale {
            inner.last_activity.remove(&tenant);
        }
    }
}

impl Default for PriorityBucket {
    fn default() -> Self {
        Self::new()
    }
}
