//! The Retrieval Service binary (spec §2, §4.4): hybrid search plus
//! incremental KB sync behind a thin HTTP surface.
//!
//! The embedding, query-expansion, and rerank providers are external
//! collaborators per spec §1; this binary wires in the dev-mode
//! stand-ins from [`moduly_api::retrieval_stubs`] rather than fabricate
//! a real model client, exactly as `moduly-sandbox`'s `bypass_isolation`
//! stands in for a real jailer in development.

use std::sync::Arc;

use moduly_api::retrieval_stubs::{HashEmbeddingClient, IdentityExpansionClient, LengthOverlapReranker, MemoryChunkStore, PassthroughCipher};
use moduly_api::{retrieval_router, RetrievalServiceConfig, RetrievalState};
use moduly_storage::{MemoryKeywordIndex, MemoryVectorIndex};
use tracing::info;

const DEV_EMBEDDING_DIMS: usize = 128;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = moduly_log::init();
    let config = RetrievalServiceConfig::from_env();

    let state = RetrievalState::new(
        Arc::new(MemoryVectorIndex::new()),
        Arc::new(MemoryKeywordIndex::new()),
        Arc::new(MemoryChunkStore::new()),
        Arc::new(HashEmbeddingClient::new(DEV_EMBEDDING_DIMS)),
        Arc::new(PassthroughCipher),
        Arc::new(IdentityExpansionClient),
        Arc::new(LengthOverlapReranker),
        config.clone(),
    );
    let router = retrieval_router(state);

    info!(%config.bind_addr, "retrieval service listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());
    if let Err(error) = serve.await {
        tracing::error!(%error, "retrieval service exited with error");
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
