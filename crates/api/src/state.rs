//! Shared axum `State` handles (SPEC_FULL.md §1.2 "global mutable
//! singletons → explicit dependency injection"): every port the
//! gateway's handlers need is an `Arc<dyn Trait>` field here rather
//! than a process-wide static, following the same pattern
//! `moduly-engine::Engine::new` takes its collaborators as
//! constructor arguments.

use std::sync::Arc;

use moduly_ports::{DeploymentRepo, EventBus, RunRepo, TaskQueue, WorkflowRepo};

use crate::config::GatewayConfig;

/// Everything a Gateway HTTP handler needs: the repositories it reads
/// for slug/run lookups, the `workflow` queue it enqueues
/// `workflow.execute` tasks onto, and the event bus its SSE handler
/// subscribes to.
#[derive(Clone)]
pub struct GatewayState {
    /// Resolves a deployment's frozen graph by id or public slug.
    pub deployment_repo: Arc<dyn DeploymentRepo>,
    /// Resolves a workflow definition by id, for direct (non-deployment)
    /// test runs.
    pub workflow_repo: Arc<dyn WorkflowRepo>,
    /// Run/node-run rows, read by `GET /run-status/{run_id}`.
    pub run_repo: Arc<dyn RunRepo>,
    /// The `workflow` queue `workflow.execute` tasks are enqueued onto.
    pub workflow_queue: Arc<dyn TaskQueue>,
    /// The per-run event bus the SSE handler subscribes to.
    pub event_bus: Arc<dyn EventBus>,
    /// Bearer-JWT secret; empty disables the auth gate (dev only).
    pub jwt_secret: Arc<str>,
    /// SSE/run-status tuning (idle timeout, overall run deadline).
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Build gateway state from its collaborators and configuration.
    #[must_use]
    pub fn new(
        deployment_repo: Arc<dyn DeploymentRepo>,
        workflow_repo: Arc<dyn WorkflowRepo>,
        run_repo: Arc<dyn RunRepo>,
        workflow_queue: Arc<dyn TaskQueue>,
        event_bus: Arc<dyn EventBus>,
        config: GatewayConfig,
    ) -> Self {
        let jwt_secret: Arc<str> = Arc::from(config.jwt_secret.as_str());
        Self {
            deployment_repo,
            workflow_repo,
            run_repo,
            workflow_queue,
            event_bus,
            jwt_secret,
            config,
        }
    }
}

/// Everything the sandbox service's HTTP surface needs (spec §6
/// "Sandbox API"): a handle to the running scheduler.
#[derive(Clone)]
pub struct SandboxState {
    /// The MLFQ scheduler jobs are submitted to.
    pub scheduler: Arc<moduly_sandbox::Scheduler>,
}

impl SandboxState {
    /// Wrap a running scheduler as sandbox-service state.
    #[must_use]
    pub fn new(scheduler: Arc<moduly_sandbox::Scheduler>) -> Self {
        Self { scheduler }
    }
}

/// Everything the retrieval service's HTTP surface needs (spec §4.4):
/// the hybrid indices, the row store backing them, and the dev-mode
/// provider stand-ins (see [`crate::retrieval_stubs`]).
#[derive(Clone)]
pub struct RetrievalState {
    /// Dense index.
    pub vector_index: Arc<dyn moduly_ports::VectorIndex>,
    /// Sparse index.
    pub keyword_index: Arc<dyn moduly_ports::KeywordIndex>,
    /// Chunk row data backing both indices.
    pub chunk_store: Arc<crate::retrieval_stubs::MemoryChunkStore>,
    /// Embedding provider.
    pub embedder: Arc<dyn moduly_retrieval::EmbeddingClient>,
    /// Content cipher.
    pub cipher: Arc<dyn moduly_retrieval::ContentCipher>,
    /// Query expansion provider.
    pub expansion: Arc<dyn moduly_retrieval::QueryExpansionClient>,
    /// Cross-encoder reranker.
    pub reranker: Arc<dyn moduly_retrieval::RerankClient>,
    /// RRF fusion constant and bind address.
    pub config: crate::config::RetrievalServiceConfig,
}

impl RetrievalState {
    /// Build retrieval service state over its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vector_index: Arc<dyn moduly_ports::VectorIndex>,
        keyword_index: Arc<dyn moduly_ports::KeywordIndex>,
        chunk_store: Arc<crate::retrieval_stubs::MemoryChunkStore>,
        embedder: Arc<dyn moduly_retrieval::EmbeddingClient>,
        cipher: Arc<dyn moduly_retrieval::ContentCipher>,
        expansion: Arc<dyn moduly_retrieval::QueryExpansionClient>,
        reranker: Arc<dyn moduly_retrieval::RerankClient>,
        config: crate::config::RetrievalServiceConfig,
    ) -> Self {
        Self {
            vector_index,
            keyword_index,
            chunk_store,
            embedder,
            cipher,
            expansion,
            reranker,
            config,
        }
    }
}
