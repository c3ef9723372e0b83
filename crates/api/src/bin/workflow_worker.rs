//! The Workflow Engine worker binary (spec §2 "Workflow Engine
//! (worker)"): dequeues `workflow.execute` tasks from the `workflow`
//! queue and runs each to completion against [`moduly_engine::Engine`].
//!
//! Deployed standalone this binary needs the same queue/event-bus/
//! repository handles the Gateway's embedded copy of this loop uses
//! (see `gateway.rs`); here it dials them up itself so the Workflow
//! Engine can scale independently of the Gateway's HTTP surface, per
//! spec §2's component table.

use std::sync::Arc;

use moduly_api::builtin_actions::minimal_registry;
use moduly_engine::{Engine, EngineConfig, RunMeta};
use moduly_eventbus::BroadcastEventBus;
use moduly_ports::TaskQueue;
use moduly_storage::{MemoryQueue, MemoryWorkflowRepo};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = moduly_log::init();

    let workflow_repo: Arc<dyn moduly_ports::WorkflowRepo> = Arc::new(MemoryWorkflowRepo::new());
    let workflow_queue: Arc<dyn TaskQueue> = Arc::new(MemoryQueue::new(QUEUE_CAPACITY));
    let log_queue: Arc<dyn TaskQueue> = Arc::new(MemoryQueue::new(QUEUE_CAPACITY));
    let event_bus: Arc<dyn moduly_ports::EventBus> = Arc::new(BroadcastEventBus::new());

    let engine = Arc::new(Engine::new(
        Arc::new(minimal_registry()),
        event_bus,
        log_queue,
        Some(workflow_repo),
        EngineConfig::from_env(),
    ));

    let cancellation = CancellationToken::new();
    let worker_cancellation = cancellation.clone();
    let worker_queue = Arc::clone(&workflow_queue);
    let worker = tokio::spawn(async move {
        run_worker(engine, worker_queue.as_ref(), worker_cancellation).await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
    }
    cancellation.cancel();
    if let Err(error) = worker.await {
        warn!(%error, "workflow worker task panicked");
    }
    Ok(())
}

async fn run_worker(engine: Arc<Engine>, queue: &dyn TaskQueue, cancellation: CancellationToken) {
    use moduly_api::WorkflowExecuteTask;

    loop {
        let dequeued = tokio::select! {
            () = cancellation.cancelled() => return,
            result = queue.dequeue(std::time::Duration::from_secs(1)) => result,
        };
        let Ok(Some((task_id, payload))) = dequeued else {
            continue;
        };
        let task: WorkflowExecuteTask = match serde_json::from_value(payload.into_json()) {
            Ok(task) => task,
            Err(error) => {
                error!(%error, "malformed workflow.execute task");
                let _ = queue.nack(&task_id).await;
                continue;
            }
        };
        let mut meta = RunMeta::new(task.workflow_id).with_trigger_mode(task.trigger_mode);
        if let Some(user_id) = task.user_id {
            meta = meta.with_user(user_id);
        }
        let engine = Arc::clone(&engine);
        let ack_id = task_id.clone();
        tokio::spawn(async move {
            if let Err(error) = engine.run(task.run_id, &meta, &task.graph, task.inputs).await {
                warn!(%error, run_id = %task.run_id, "run finished with error");
            }
        });
        let _ = queue.ack(&ack_id).await;
    }
}
