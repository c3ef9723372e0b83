//! The MLFQ fair scheduler (spec §4.3): three priority buckets with
//! per-tenant round-robin dispatch, background aging promotion,
//! EMA-driven dynamic worker sizing, and backpressure on queue depth.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_error::Error;
use moduly_ports::sandbox::{Job, JobOutcome, Priority, SandboxRunner};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bucket::PriorityBucket;
use crate::config::SandboxConfig;
use crate::executor::Executor;
use crate::history::ExecutionHistory;
use crate::queued::QueuedJob;

const HIGH: usize = Priority::High as usize;
const NORMAL: usize = Priority::Normal as usize;
const LOW: usize = Priority::Low as usize;

/// A point-in-time snapshot of the scheduler's counters (spec §4.3,
/// exposed by the sandbox service's `/metrics` endpoint).
#[derive(Debug, Clone, Copy)]
pub struct SchedulerMetrics {
    /// Jobs waiting in the `High` bucket.
    pub queue_high: usize,
    /// Jobs waiting in the `Normal` bucket.
    pub queue_normal: usize,
    /// Jobs waiting in the `Low` bucket.
    pub queue_low: usize,
    /// Jobs currently executing.
    pub running_count: usize,
    /// Lifetime count of jobs submitted.
    pub total_submitted: u64,
    /// Lifetime count of jobs that completed (success or job-level failure).
    pub total_completed: u64,
    /// Lifetime count of jobs whose isolation harness itself failed.
    pub total_failed: u64,
    /// Lifetime count of aging promotions applied.
    pub total_aged: u64,
    /// Current size of the worker pool.
    pub current_workers: usize,
    /// Configured worker pool floor.
    pub min_workers: usize,
    /// Configured worker pool ceiling.
    pub max_workers: usize,
    /// Smoothed requests-per-second estimate driving worker sizing.
    pub ema_rps: f64,
    /// Distinct tenants currently holding a waiting or running job.
    pub active_tenants: usize,
}

/// The sandbox scheduler: an MLFQ over [`PriorityBucket`]s, backed by
/// a pool of isolated-execution workers.
pub struct Scheduler {
    config: SandboxConfig,
    executor: Arc<Executor>,
    history: Arc<ExecutionHistory>,
    buckets: [PriorityBucket; 3],
    running_count: AtomicUsize,
    current_workers: AtomicUsize,
    tenant_running: DashMap<String, usize>,
    total_submitted: AtomicU64,
    total_completed: AtomicU64,
    total_failed: AtomicU64,
    total_aged: AtomicU64,
    ema_rps: Mutex<f64>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Build a scheduler over `config`, starting at `min_workers`.
    #[must_use]
    pub fn new(config: SandboxConfig) -> Arc<Self> {
        let history = Arc::new(ExecutionHistory::new(10_000));
        let executor = Arc::new(Executor::new(config.clone()));
        let current_workers = config.min_workers;
        Arc::new(Self {
            config,
            executor,
            history,
            buckets: [PriorityBucket::new(), PriorityBucket::new(), PriorityBucket::new()],
            running_count: AtomicUsize::new(0),
            current_workers: AtomicUsize::new(current_workers),
            tenant_running: DashMap::new(),
            total_submitted: AtomicU64::new(0),
            total_completed: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            total_aged: AtomicU64::new(0),
            ema_rps: Mutex::new(0.0),
            cancel: CancellationToken::new(),
        })
    }

    /// Spawn the dispatcher, aging, and auto-scaling background tasks.
    ///
    /// The caller retains the returned handles only to await clean
    /// shutdown after [`shutdown`](Self::shutdown); dropping them does
    /// not stop the tasks.
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            tokio::spawn(Arc::clone(self).dispatch_loop()),
            tokio::spawn(Arc::clone(self).aging_loop()),
            tokio::spawn(Arc::clone(self).scaling_loop()),
        ]
    }

    /// Signal every background task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// A snapshot of the scheduler's current counters.
    #[must_use]
    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            queue_high: self.buckets[HIGH].len(),
            queue_normal: self.buckets[NORMAL].len(),
            queue_low: self.buckets[LOW].len(),
            running_count: self.running_count.load(Ordering::Relaxed),
            total_submitted: self.total_submitted.load(Ordering::Relaxed),
            total_completed: self.total_completed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_aged: self.total_aged.load(Ordering::Relaxed),
            current_workers: self.current_workers.load(Ordering::Relaxed),
            min_workers: self.config.min_workers,
            max_workers: self.config.max_workers,
            ema_rps: *self.ema_rps.lock(),
            active_tenants: self.buckets.iter().map(PriorityBucket::active_tenants).sum(),
        }
    }

    fn total_queue_depth(&self) -> usize {
        self.buckets[HIGH].len() + self.buckets[NORMAL].len() + self.buckets[LOW].len()
    }

    fn tenant_key(tenant_id: &str) -> String {
        if tenant_id.is_empty() { "__default__".to_string() } else { tenant_id.to_string() }
    }

    fn pop_next_ready_job(&self) -> Option<QueuedJob> {
        let cap = self.config.max_per_tenant;
        for bucket in &self.buckets {
            let in_flight = |tenant: &str| self.tenant_running.get(tenant).map(|e| *e).unwrap_or(0);
            if let Some(job) = bucket.pop_next_ready(cap, in_flight) {
                return Some(job);
            }
        }
        None
    }

    fn dispatch(self: &Arc<Self>, queued: QueuedJob) {
        self.running_count.fetch_add(1, Ordering::SeqCst);
        let tenant = Self::tenant_key(&queued.job.tenant_id);
        *self.tenant_running.entry(tenant.clone()).or_insert(0) += 1;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let start = Instant::now();
            let outcome = this.executor.execute(&queued.job).await;
            this.history.record(&queued.job.code, start.elapsed());

            match &outcome {
                Ok(_) => {
                    this.total_completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    this.total_failed.fetch_add(1, Ordering::Relaxed);
                }
            }

            this.running_count.fetch_sub(1, Ordering::SeqCst);
            if let Some(mut entry) = this.tenant_running.get_mut(&tenant) {
                *entry = entry.saturating_sub(1);
            }
            if queued.completion.send(outcome).is_err() {
                warn!(job_id = %queued.id, "sandbox job completed but caller already dropped its receiver");
            }
        });
    }

    async fn dispatch_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(20));
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            while self.running_count.load(Ordering::SeqCst) < self.current_workers.load(Ordering::Relaxed) {
                let Some(queued) = self.pop_next_ready_job() else { break };
                self.dispatch(queued);
            }
        }
    }

    async fn aging_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.aging_interval);
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            let promoted_to_normal = self.buckets[LOW].drain_aged(self.config.aging_threshold_low);
            self.total_aged.fetch_add(promoted_to_normal.len() as u64, Ordering::Relaxed);
            for job in promoted_to_normal {
                self.buckets[NORMAL].push(job);
            }

            let promoted_to_high = self.buckets[NORMAL].drain_aged(self.config.aging_threshold_normal);
            self.total_aged.fetch_add(promoted_to_high.len() as u64, Ordering::Relaxed);
            for job in promoted_to_high {
                self.buckets[HIGH].push(job);
            }
        }
    }

    async fn scaling_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.scaling_interval);
        let mut last_total = 0u64;
        let mut last_scale_down: Option<Instant> = None;
        let mut idle_since: Option<Instant> = None;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let total_now = self.total_submitted.load(Ordering::Relaxed);
            let delta = total_now.saturating_sub(last_total);
            last_total = total_now;
            let sample_rps = delta as f64 / self.config.scaling_interval.as_secs_f64().max(0.001);

            let target = {
                let mut ema = self.ema_rps.lock();
                *ema = self.config.ema_alpha * sample_rps + (1.0 - self.config.ema_alpha) * *ema;
                let raw_target = (*ema / self.config.target_rps_per_worker).ceil();
                (raw_target as usize).clamp(self.config.min_workers, self.config.max_workers)
            };

            let current = self.current_workers.load(Ordering::Relaxed);
            let now = Instant::now();
            match target.cmp(&current) {
                std::cmp::Ordering::Greater => {
                    self.current_workers.store(target, Ordering::Relaxed);
                    idle_since = None;
                }
                std::cmp::Ordering::Less => {
                    let idle_start = *idle_since.get_or_insert(now);
                    let cooled_down =
                        last_scale_down.is_none_or(|t| now.duration_since(t) >= self.config.scale_down_cooldown);
                    if now.duration_since(idle_start) >= self.config.scale_down_idle_time && cooled_down {
                        self.current_workers.store(target, Ordering::Relaxed);
                        last_scale_down = Some(now);
                        idle_since = None;
                    }
                }
                std::cmp::Ordering::Equal => idle_since = None,
            }
        }
    }
}

#[async_trait]
impl SandboxRunner for Scheduler {
    async fn execute(&self, job: Job) -> Result<JobOutcome, Error> {
        let depth = self.total_queue_depth();
        if depth >= self.config.max_queue_size {
            return Err(Error::Overloaded { depth, max: self.config.max_queue_size });
        }

        let priority = job.priority.unwrap_or_else(|| self.history.suggest_priority(&job.code, Priority::Normal));
        let (queued, completion) = QueuedJob::new(job);
        self.total_submitted.fetch_add(1, Ordering::Relaxed);
        self.buckets[priority as usize].push(queued);

        completion
            .await
            .map_err(|_| Error::Internal("sandbox scheduler dropped the job before completion".into()))?
    }
}

#[cfg(test)]
fn _assert_send_sync<T: Send + Sync>() {}

#[cfg(test)]
const _: fn() = || _assert_send_sync::<Scheduler>();
