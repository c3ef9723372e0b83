//! The Gateway binary (spec §2, §6).
//!
//! `moduly-storage`'s in-memory drivers are documented as suitable for
//! "single-process and test deployments" — a durable relational/broker
//! swap behind the same ports is future work, not something this
//! binary can fabricate — so this entry point runs the full local
//! stack in one process: the Gateway's HTTP surface, the workflow
//! engine consuming its own queue, and the Log Writer consuming its own
//! queue, all sharing the same in-memory repositories and event bus.
//! `moduly-workflow-worker` and `moduly-logwriter-worker` exist as
//! separate binaries for spec §2's component table and for a future
//! deployment backed by a real broker/store, but are redundant with
//! this one for local use.

use std::sync::Arc;

use moduly_api::builtin_actions::minimal_registry;
use moduly_api::{GatewayConfig, GatewayState};
use moduly_engine::{Engine, EngineConfig, RunMeta};
use moduly_eventbus::BroadcastEventBus;
use moduly_ports::TaskQueue;
use moduly_storage::{MemoryDeploymentRepo, MemoryQueue, MemoryRunRepo, MemoryWorkflowRepo};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = moduly_log::init();
    let config = GatewayConfig::from_env();

    let deployment_repo: Arc<dyn moduly_ports::DeploymentRepo> = Arc::new(MemoryDeploymentRepo::new());
    let workflow_repo: Arc<dyn moduly_ports::WorkflowRepo> = Arc::new(MemoryWorkflowRepo::new());
    let run_repo: Arc<dyn moduly_ports::RunRepo> = Arc::new(MemoryRunRepo::new());
    let workflow_queue: Arc<dyn TaskQueue> = Arc::new(MemoryQueue::new(QUEUE_CAPACITY));
    let log_queue: Arc<dyn TaskQueue> = Arc::new(MemoryQueue::new(QUEUE_CAPACITY));
    let event_bus: Arc<dyn moduly_ports::EventBus> = Arc::new(BroadcastEventBus::new());

    let cancellation = CancellationToken::new();

    let engine = Arc::new(Engine::new(
        Arc::new(minimal_registry()),
        Arc::clone(&event_bus),
        Arc::clone(&log_queue),
        Some(Arc::clone(&workflow_repo)),
        EngineConfig::from_env(),
    ));
    let engine_queue = Arc::clone(&workflow_queue);
    let engine_cancellation = cancellation.clone();
    let engine_task = tokio::spawn(async move {
        run_workflow_worker(engine, engine_queue.as_ref(), engine_cancellation).await;
    });

    let log_writer = Arc::new(moduly_logwriter::LogWriter::new(Arc::clone(&run_repo)));
    let log_queue_for_writer = Arc::clone(&log_queue);
    let log_cancellation = cancellation.clone();
    let log_task = tokio::spawn(async move {
        log_writer
            .run_forever(log_queue_for_writer.as_ref(), log_cancellation)
            .await;
    });

    let state = GatewayState::new(deployment_repo, workflow_repo, run_repo, workflow_queue, event_bus, config.clone());
    let router = moduly_api::gateway_router(state);

    info!(%config.bind_addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());
    if let Err(error) = serve.await {
        error!(%error, "gateway server exited with error");
    }

    cancellation.cancel();
    if let Err(error) = engine_task.await {
        warn!(%error, "workflow worker task panicked");
    }
    if let Err(error) = log_task.await {
        warn!(%error, "log writer task panicked");
    }
    Ok(())
}

/// Dequeue `workflow.execute` tasks and run them to completion, one at
/// a time, until `cancellation` fires. Concurrency across runs is the
/// engine's own internal concern (spec §4.1's per-run concurrency
/// gate); this loop just keeps feeding it the queue.
async fn run_workflow_worker(engine: Arc<Engine>, queue: &dyn TaskQueue, cancellation: CancellationToken) {
    use moduly_api::WorkflowExecuteTask;

    loop {
        if cancellation.is_cancelled() {
            return;
        }
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
        let queue_ack_id = task_id.clone();
        tokio::spawn(async move {
            if let Err(error) = engine.run(task.run_id, &meta, &task.graph, task.inputs).await {
                warn!(%error, run_id = %task.run_id, "run finished with error");
            }
        });
        let _ = queue.ack(&queue_ack_id).await;
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
