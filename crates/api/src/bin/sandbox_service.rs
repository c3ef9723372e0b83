//! The Sandbox Service binary (spec §2, §4.3, §6 "Sandbox API"): the
//! MLFQ fair scheduler behind a thin HTTP surface for job submission
//! and metrics.

use moduly_api::{sandbox_router, SandboxServiceConfig, SandboxState};
use moduly_sandbox::{SandboxConfig, Scheduler};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = moduly_log::init();
    let service_config = SandboxServiceConfig::from_env();

    let scheduler = Scheduler::new(SandboxConfig::from_env());
    let background = scheduler.spawn_background_tasks();

    let state = SandboxState::new(scheduler.clone());
    let router = sandbox_router(state);

    info!(%service_config.bind_addr, "sandbox service listening");
    let listener = tokio::net::TcpListener::bind(service_config.bind_addr).await?;
    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());
    if let Err(error) = serve.await {
        tracing::error!(%error, "sandbox service exited with error");
    }

    scheduler.shutdown();
    for handle in background {
        let _ = handle.await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
