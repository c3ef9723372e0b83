//! The Log Writer worker binary (spec §2 "Log Writer (worker)"):
//! dequeues `log.*` tasks and idempotently upserts run/node-run rows.
//! Standalone so it can scale independently of the Gateway's embedded
//! copy of this loop (see `gateway.rs`).

use std::sync::Arc;

use moduly_ports::TaskQueue;
use moduly_storage::{MemoryQueue, MemoryRunRepo};
use tokio_util::sync::CancellationToken;

const QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = moduly_log::init();

    let run_repo: Arc<dyn moduly_ports::RunRepo> = Arc::new(MemoryRunRepo::new());
    let log_queue: Arc<dyn TaskQueue> = Arc::new(MemoryQueue::new(QUEUE_CAPACITY));

    let log_writer = moduly_logwriter::LogWriter::new(run_repo);

    let cancellation = CancellationToken::new();
    let worker_cancellation = cancellation.clone();
    let worker_queue = Arc::clone(&log_queue);
    let worker = tokio::spawn(async move {
        log_writer.run_forever(worker_queue.as_ref(), worker_cancellation).await;
    });

    let _ = tokio::signal::ctrl_c().await;
    cancellation.cancel();
    let _ = worker.await;
    Ok(())
}
