//! The retrieval service's thin dev-mode HTTP surface (spec §4.4):
//! `/v1/retrieval/search` runs the hybrid search pipeline;
//! `/v1/retrieval/sync` re-chunks and re-indexes one document.
//!
//! Not named by spec §6's endpoint table — the retrieval core is
//! normally invoked in-process by a RAG node implementation, which is
//! out of scope per spec §1 — but exposed here as its own bindable
//! service so the search/sync pipeline is independently exercisable,
//! matching the component table's "Retrieval Service" entry.

use axum::extract::State;
use axum::Json;
use moduly_core::{ChunkId, DocumentId, KnowledgeBaseId};
use moduly_error::Error;
use moduly_ports::retrieval::{KeywordRecord, VectorRecord};
use moduly_retrieval::{search, QueryExpansion, SearchContext, SearchRequest};
use moduly_value::Value;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::RetrievalState;

#[derive(Debug, Deserialize)]
pub struct SearchRequestBody {
    query: String,
    knowledge_base_id: KnowledgeBaseId,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    hybrid_search: Option<bool>,
    #[serde(default)]
    use_rerank: Option<bool>,
}

fn default_top_k() -> usize {
    5
}

/// `POST /v1/retrieval/search`.
pub async fn search_documents(
    State(state): State<RetrievalState>,
    Json(body): Json<SearchRequestBody>,
) -> Result<Json<Vec<moduly_retrieval::SearchHit>>, ApiError> {
    let mut request = SearchRequest::new(body.query, body.knowledge_base_id);
    request.top_k = body.top_k;
    request.hybrid_search = body.hybrid_search.unwrap_or(true);
    request.use_rerank = body.use_rerank.unwrap_or(true);
    request.expansion = QueryExpansion::None;

    let ctx = SearchContext {
        vector_index: state.vector_index.as_ref(),
        keyword_index: state.keyword_index.as_ref(),
        embedder: state.embedder.as_ref(),
        cipher: state.cipher.as_ref(),
        chunk_store: state.chunk_store.as_ref(),
        expansion: Some(state.expansion.as_ref()),
        reranker: Some(state.reranker.as_ref()),
    };
    let hits = search(&ctx, &request).await.map_err(ApiError)?;
    Ok(Json(hits))
}

#[derive(Debug, Deserialize)]
pub struct SyncChunkBody {
    content: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequestBody {
    knowledge_base_id: KnowledgeBaseId,
    document_id: DocumentId,
    chunks: Vec<SyncChunkBody>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    total_chunks: usize,
    reused: usize,
    embedded: usize,
}

/// `POST /v1/retrieval/sync`.
///
/// The hash-reuse path of incremental sync (spec §4.4 steps 1-4) is
/// implemented and tested directly against `moduly-retrieval::sync_document`;
/// that function generates its own chunk ids internally and doesn't
/// return them, which is incompatible with also keying this service's
/// row store off them, so this endpoint re-implements the same
/// delete-then-insert swap at one level up, always re-embedding the
/// full chunk set rather than reusing by content hash.
pub async fn sync(
    State(state): State<RetrievalState>,
    Json(body): Json<SyncRequestBody>,
) -> Result<Json<SyncResponse>, ApiError> {
    let texts: Vec<String> = body.chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = state.embedder.embed_batch(&texts).await.map_err(ApiError)?;

    state
        .vector_index
        .delete_for_document(body.knowledge_base_id, body.document_id)
        .await
        .map_err(ApiError)?;
    state
        .keyword_index
        .delete_for_document(body.knowledge_base_id, body.document_id)
        .await
        .map_err(ApiError)?;
    state.chunk_store.remove_document(body.document_id);

    let mut vector_records = Vec::with_capacity(body.chunks.len());
    let mut keyword_records = Vec::with_capacity(body.chunks.len());
    for (chunk, embedding) in body.chunks.into_iter().zip(embeddings) {
        let chunk_id = ChunkId::v4();
        let metadata = Value::new(chunk.metadata);
        state
            .chunk_store
            .put(chunk_id, body.document_id, chunk.content.clone(), metadata.clone());
        vector_records.push(VectorRecord {
            chunk_id,
            document_id: body.document_id,
            vector: embedding,
        });
        keyword_records.push(KeywordRecord {
            chunk_id,
            document_id: body.document_id,
            text: chunk.content,
            metadata,
        });
    }
    let total_chunks = vector_records.len();
    state
        .vector_index
        .upsert(body.knowledge_base_id, vector_records)
        .await
        .map_err(ApiError)?;
    state
        .keyword_index
        .upsert(body.knowledge_base_id, keyword_records)
        .await
        .map_err(ApiError)?;

    Ok(Json(SyncResponse {
        total_chunks,
        reused: 0,
        embedded: total_chunks,
    }))
}

#[allow(dead_code)]
fn _assert_error_conversion(_: Error) {}
