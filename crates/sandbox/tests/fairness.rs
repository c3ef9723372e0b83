//! Scheduler fairness, backpressure, and aging (spec §8 scenario 4 and
//! the "fair dispatch"/"aging progress" invariants), exercised against
//! a real [`Scheduler`] with `bypass_isolation` off and a stub
//! interpreter path that always fails fast — these tests only check
//! dispatch order and queue bookkeeping, not real code execution.

use std::time::Duration;

use moduly_ports::sandbox::{Job, Priority, SandboxRunner};
use moduly_sandbox::{SandboxConfig, Scheduler};
use moduly_value::Value;

fn job(tenant: &str, priority: Priority) -> Job {
    Job {
        code: "def main(inputs): return {}".into(),
        inputs: Value::null(),
        timeout: Duration::from_millis(50),
        priority: Some(priority),
        tenant_id: tenant.to_string(),
        enable_network: false,
    }
}

fn fast_config() -> SandboxConfig {
    let mut config = SandboxConfig::default();
    config.min_workers = 2;
    config.max_workers = 2;
    config.max_per_tenant = 3;
    config.max_queue_size = 64;
    config.default_timeout = Duration::from_millis(50);
    config.max_timeout = Duration::from_millis(100);
    config.aging_interval = Duration::from_millis(20);
    config.aging_threshold_low = Duration::from_millis(60);
    config.aging_threshold_normal = Duration::from_millis(120);
    config
}

#[tokio::test]
async fn backpressure_rejects_once_queue_depth_exceeds_max() {
    let mut config = fast_config();
    config.min_workers = 0;
    config.max_workers = 0;
    config.max_queue_size = 2;
    let scheduler = Scheduler::new(config);

    // No workers run, so both submissions sit in the queue; a third
    // submission observes depth >= max_queue_size and is rejected
    // before it ever reaches a bucket.
    let _handles = scheduler.spawn_background_tasks();
    let j1 = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.execute(job("a", Priority::Normal)).await }
    });
    let j2 = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.execute(job("a", Priority::Normal)).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let third = scheduler.execute(job("a", Priority::Normal)).await;
    assert!(matches!(third, Err(moduly_error::Error::Overloaded { .. })));

    j1.abort();
    j2.abort();
}

#[tokio::test]
async fn per_tenant_cap_limits_concurrent_dispatch() {
    let mut config = fast_config();
    config.min_workers = 8;
    config.max_workers = 8;
    config.max_per_tenant = 3;
    let scheduler = Scheduler::new(config);
    let _handles = scheduler.spawn_background_tasks();

    for _ in 0..4 {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let _ = scheduler.execute(job("only-tenant", Priority::Normal)).await;
        });
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    let metrics = scheduler.metrics();
    assert!(metrics.running_count <= 3, "tenant cap of 3 must not be exceeded, got {}", metrics.running_count);
}

#[tokio::test]
async fn aging_promotes_low_priority_job_to_high_bucket() {
    let mut config = fast_config();
    config.min_workers = 0;
    config.max_workers = 0;
    config.aging_interval = Duration::from_millis(10);
    config.aging_threshold_low = Duration::from_millis(30);
    let scheduler = Scheduler::new(config);
    let _handles = scheduler.spawn_background_tasks();

    let scheduler2 = scheduler.clone();
    tokio::spawn(async move {
        let _ = scheduler2.execute(job("aging-tenant", Priority::Low)).await;
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(scheduler.metrics().queue_low, 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let metrics = scheduler.metrics();
    assert_eq!(metrics.queue_low, 0, "aged job must leave the low bucket");
    assert_eq!(metrics.queue_normal, 1, "aged job must land in the normal bucket");
    assert!(metrics.total_aged >= 1);
}
