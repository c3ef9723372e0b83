//! Hybrid retrieval search (spec §4.4 "Hybrid retrieval"): optional
//! query expansion, per-variant dense+sparse search fused by RRF,
//! cross-variant merge, optional cross-encoder rerank, and
//! `[ENCRYPTED CONTENT]`-degrading decryption on the way out. Ported
//! from `RetrievalService.search_documents`.

use std::collections::HashMap;

use moduly_core::{ChunkId, DocumentId, KnowledgeBaseId};
use moduly_error::Error;
use moduly_ports::{KeywordIndex, VectorIndex};
use moduly_value::Value;
use serde::Serialize;

use crate::client::{ContentCipher, EmbeddingClient, QueryExpansionClient, RerankClient};
use crate::decrypt::decrypt_content;
use crate::rrf::{fuse, merge_max, RRF_CONSTANT};

/// How a query should be expanded before search (spec §4.4 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryExpansion {
    /// Search with the query as given.
    #[default]
    None,
    /// A single LLM-driven rewrite.
    Rewrite,
    /// `num_variations` differently-angled variants.
    MultiQuery {
        /// Number of variants to generate (spec default 3).
        num_variations: usize,
    },
}

/// A fully-resolved search request (spec §4.4, mirroring
/// `search_documents`'s keyword arguments).
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// The user's query.
    pub query: String,
    /// KB to search.
    pub knowledge_base_id: KnowledgeBaseId,
    /// Final number of results to return.
    pub top_k: usize,
    /// Minimum cosine similarity, applied only when `hybrid_search` is
    /// `false` (spec §4.4 step 5).
    pub threshold: f32,
    /// Whether to also search the keyword index and fuse with RRF.
    pub hybrid_search: bool,
    /// Whether to rerank fused candidates with a cross-encoder.
    pub use_rerank: bool,
    /// How to expand the query before searching.
    pub expansion: QueryExpansion,
}

impl SearchRequest {
    /// A request over default search settings matching the teacher's
    /// `search_documents` signature defaults (hybrid + rerank on,
    /// top_k 5, threshold 0.15).
    #[must_use]
    pub fn new(query: impl Into<String>, knowledge_base_id: KnowledgeBaseId) -> Self {
        Self {
            query: query.into(),
            knowledge_base_id,
            top_k: 5,
            threshold: 0.15,
            hybrid_search: true,
            use_rerank: true,
            expansion: QueryExpansion::None,
        }
    }
}

/// One search hit (spec §4.4: "per-result `{content, document_id,
/// filename, score, metadata}`").
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Decrypted (or pass-through) chunk content.
    pub content: String,
    /// The document this chunk was extracted from.
    pub document_id: DocumentId,
    /// The chunk's similarity or rerank score, whichever the request
    /// ultimately ranked by.
    pub score: f32,
    /// `search_method`, `rrf_score`, optional `rerank_score`, and
    /// caller-supplied diagnostics, merged onto the chunk's own
    /// metadata.
    pub metadata: Value,
}

struct Candidate {
    chunk_id: ChunkId,
    document_id: DocumentId,
    content: String,
    metadata: Value,
    rrf_score: f32,
}

/// Dependencies a single [`search`] call needs, grouped so call sites
/// don't thread five separate trait objects through every helper.
pub struct SearchContext<'a> {
    /// Dense index.
    pub vector_index: &'a dyn VectorIndex,
    /// Sparse index.
    pub keyword_index: &'a dyn KeywordIndex,
    /// The KB's configured embedding model client.
    pub embedder: &'a dyn EmbeddingClient,
    /// Content cipher for on-read decryption.
    pub cipher: &'a dyn ContentCipher,
    /// Source of chunk content/metadata for ids returned by the
    /// indices (the indices themselves are score-only; this supplies
    /// the row data a result needs).
    pub chunk_store: &'a dyn ChunkStore,
    /// Query rewrite/expansion client, required only when the request
    /// asks for expansion.
    pub expansion: Option<&'a dyn QueryExpansionClient>,
    /// Cross-encoder reranker, required only when the request asks
    /// for reranking.
    pub reranker: Option<&'a dyn RerankClient>,
}

/// Looks up a chunk's content and metadata by id.
///
/// Separate from [`VectorIndex`]/[`KeywordIndex`] because those two
/// ports model score-only search; the row data a result needs back
/// (content, document, metadata) is the relational side spec §1 treats
/// as an external collaborator's storage, fetched here through its own
/// narrow seam instead of widening the index ports.
#[async_trait::async_trait]
pub trait ChunkStore: Send + Sync {
    /// Fetch `(document_id, stored_content, metadata)` for a set of
    /// chunk ids, skipping any id with no backing row.
    async fn fetch(&self, chunk_ids: &[ChunkId]) -> Result<HashMap<ChunkId, (DocumentId, String, Value)>, Error>;
}

const OVERSAMPLE_FACTOR: usize = 10;
const RERANK_CANDIDATE_CAP: usize = 100;
const DEFAULT_MULTI_QUERY_VARIATIONS: usize = 3;

/// Run a hybrid search request to completion (spec §4.4 steps 1-5).
///
/// # Errors
///
/// Propagates index, embedding, expansion, and rerank failures.
/// Per-row decryption failures never surface as an `Err`; they degrade
/// that row's content to [`crate::decrypt::PLACEHOLDER`].
pub async fn search(ctx: &SearchContext<'_>, request: &SearchRequest) -> Result<Vec<SearchHit>, Error> {
    let queries = expand_queries(ctx, request).await?;
    let oversample = request.top_k * OVERSAMPLE_FACTOR;

    let mut fused_per_variant = Vec::with_capacity(queries.len());
    let mut raw_vector_results: Vec<(ChunkId, f32)> = Vec::new();
    for q in &queries {
        let query_vector = ctx.embedder.embed(q).await?;
        let dense = ctx
            .vector_index
            .query(request.knowledge_base_id, &query_vector, oversample)
            .await?;
        if !request.hybrid_search {
            raw_vector_results = dense.clone();
        }

        if request.hybrid_search {
            let sparse = ctx
                .keyword_index
                .query(request.knowledge_base_id, q, oversample)
                .await?;
            fused_per_variant.push(fuse(&dense, &sparse, RRF_CONSTANT));
        } else {
            let mut scores = HashMap::new();
            for (rank, (chunk_id, _)) in dense.iter().enumerate() {
                scores.insert(*chunk_id, 1.0 / (RRF_CONSTANT + rank as f32 + 1.0));
            }
            fused_per_variant.push(scores);
        }
    }

    if !request.hybrid_search && queries.len() <= 1 {
        return non_hybrid_results(ctx, request, &raw_vector_results).await;
    }

    let merged = merge_max(fused_per_variant);
    let mut ranked: Vec<(ChunkId, f32)> = merged.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let is_multi_query = matches!(request.expansion, QueryExpansion::MultiQuery { .. });
    let candidate_limit = if request.use_rerank { RERANK_CANDIDATE_CAP } else { request.top_k };
    ranked.truncate(candidate_limit.max(request.top_k));

    let ids: Vec<ChunkId> = ranked.iter().map(|(id, _)| *id).collect();
    let rows = ctx.chunk_store.fetch(&ids).await?;

    let mut candidates: Vec<Candidate> = Vec::with_capacity(ranked.len());
    for (chunk_id, rrf_score) in ranked {
        let Some((document_id, stored_content, metadata)) = rows.get(&chunk_id) else { continue };
        let content = decrypt_content(ctx.cipher, stored_content).await;
        candidates.push(Candidate {
            chunk_id,
            document_id: *document_id,
            content,
            metadata: metadata.clone(),
            rrf_score,
        });
    }

    let search_method = match (request.hybrid_search, is_multi_query) {
        (true, _) if request.use_rerank => "hybrid+rerank",
        (true, _) => "hybrid",
        (false, true) if request.use_rerank => "multi_query+rerank",
        (false, true) => "multi_query",
        (false, false) => "vector",
    };

    if request.use_rerank {
        let Some(reranker) = ctx.reranker else {
            return Err(Error::Internal("rerank requested but no RerankClient configured".into()));
        };
        let pairs: Vec<(String, String)> = candidates
            .iter()
            .map(|c| (request.query.clone(), c.content.clone()))
            .collect();
        let scores = reranker.score(&pairs).await?;
        let mut scored: Vec<(Candidate, f32)> = candidates.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(request.top_k);
        Ok(scored
            .into_iter()
            .map(|(c, rerank_score)| {
                let mut metadata = c.metadata.into_json();
                set_meta(&mut metadata, "search_method", search_method.into());
                set_meta(&mut metadata, "rerank_score", serde_json::json!(rerank_score));
                set_meta(&mut metadata, "rrf_score", serde_json::json!(c.rrf_score));
                if is_multi_query {
                    set_meta(&mut metadata, "num_queries", serde_json::json!(queries.len()));
                }
                SearchHit {
                    content: c.content,
                    document_id: c.document_id,
                    score: rerank_score,
                    metadata: Value::new(metadata),
                }
            })
            .collect())
    } else {
        candidates.truncate(request.top_k);
        Ok(candidates
            .into_iter()
            .map(|c| {
                let mut metadata = c.metadata.into_json();
                set_meta(&mut metadata, "search_method", search_method.into());
                set_meta(&mut metadata, "rrf_score", serde_json::json!(c.rrf_score));
                if is_multi_query {
                    set_meta(&mut metadata, "num_queries", serde_json::json!(queries.len()));
                }
                SearchHit {
                    content: c.content,
                    document_id: c.document_id,
                    score: c.rrf_score,
                    metadata: Value::new(metadata),
                }
            })
            .collect())
    }
}

async fn expand_queries(ctx: &SearchContext<'_>, request: &SearchRequest) -> Result<Vec<String>, Error> {
    match request.expansion {
        QueryExpansion::None => Ok(vec![request.query.clone()]),
        QueryExpansion::Rewrite => {
            let Some(client) = ctx.expansion else {
                return Err(Error::Internal("query rewrite requested but no QueryExpansionClient configured".into()));
            };
            Ok(vec![client.rewrite(&request.query).await?])
        }
        QueryExpansion::MultiQuery { num_variations } => {
            let Some(client) = ctx.expansion else {
                return Err(Error::Internal("multi-query requested but no QueryExpansionClient configured".into()));
            };
            let variations = if num_variations == 0 { DEFAULT_MULTI_QUERY_VARIATIONS } else { num_variations };
            client.expand(&request.query, variations).await
        }
    }
}

async fn non_hybrid_results(
    ctx: &SearchContext<'_>,
    request: &SearchRequest,
    dense: &[(ChunkId, f32)],
) -> Result<Vec<SearchHit>, Error> {
    let ids: Vec<ChunkId> = dense.iter().map(|(id, _)| *id).collect();
    let rows = ctx.chunk_store.fetch(&ids).await?;
    let mut hits = Vec::with_capacity(request.top_k);
    for (chunk_id, similarity) in dense {
        if hits.len() >= request.top_k {
            break;
        }
        if *similarity < request.threshold {
            continue;
        }
        let Some((document_id, stored_content, _)) = rows.get(chunk_id) else { continue };
        let content = decrypt_content(ctx.cipher, stored_content).await;
        hits.push(SearchHit {
            content,
            document_id: *document_id,
            score: *similarity,
            metadata: Value::new(serde_json::json!({})),
        });
    }
    Ok(hits)
}

fn set_meta(metadata: &mut serde_json::Value, key: &str, value: serde_json::Value) {
    if !metadata.is_object() {
        *metadata = serde_json::json!({});
    }
    metadata.as_object_mut().expect("just ensured object").insert(key.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use moduly_storage::{MemoryKeywordIndex, MemoryVectorIndex};
    use moduly_ports::{KeywordRecord, VectorRecord};
    use pretty_assertions::assert_eq;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
            Ok(self.0.clone())
        }
    }

    struct PassthroughCipher;

    #[async_trait]
    impl ContentCipher for PassthroughCipher {
        async fn decrypt(&self, token: &str) -> Result<String, Error> {
            Ok(token.to_string())
        }
    }

    struct FakeStore(HashMap<ChunkId, (DocumentId, String, Value)>);

    #[async_trait]
    impl ChunkStore for FakeStore {
        async fn fetch(&self, chunk_ids: &[ChunkId]) -> Result<HashMap<ChunkId, (DocumentId, String, Value)>, Error> {
            Ok(chunk_ids
                .iter()
                .filter_map(|id| self.0.get(id).map(|row| (*id, row.clone())))
                .collect())
        }
    }

    struct FirstWins;

    #[async_trait]
    impl RerankClient for FirstWins {
        async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, Error> {
            Ok((0..pairs.len()).rev().map(|i| i as f32).collect())
        }
    }

    #[tokio::test]
    async fn hybrid_search_returns_fused_and_annotated_hits() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let chunk = ChunkId::v4();
        vectors
            .upsert(kb, vec![VectorRecord { chunk_id: chunk, document_id: doc, vector: vec![1.0, 0.0] }])
            .await
            .unwrap();
        keywords
            .upsert(
                kb,
                vec![KeywordRecord {
                    chunk_id: chunk,
                    document_id: doc,
                    text: "rust async runtime".into(),
                    metadata: Value::null(),
                }],
            )
            .await
            .unwrap();
        let mut store = HashMap::new();
        store.insert(chunk, (doc, "rust async runtime".to_string(), Value::null()));

        let ctx = SearchContext {
            vector_index: &vectors,
            keyword_index: &keywords,
            embedder: &FixedEmbedder(vec![1.0, 0.0]),
            cipher: &PassthroughCipher,
            chunk_store: &FakeStore(store),
            expansion: None,
            reranker: Some(&FirstWins),
        };
        let request = SearchRequest::new("async runtime", kb);
        let hits = search(&ctx, &request).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, doc);
        assert_eq!(hits[0].metadata.get_path(&["search_method"]).unwrap(), "hybrid+rerank");
        assert!(hits[0].metadata.get_path(&["rrf_score"]).is_some());
    }

    #[tokio::test]
    async fn non_hybrid_mode_applies_similarity_threshold() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let near = ChunkId::v4();
        let far = ChunkId::v4();
        vectors
            .upsert(
                kb,
                vec![
                    VectorRecord { chunk_id: near, document_id: doc, vector: vec![1.0, 0.0] },
                    VectorRecord { chunk_id: far, document_id: doc, vector: vec![0.0, 1.0] },
                ],
            )
            .await
            .unwrap();
        let mut store = HashMap::new();
        store.insert(near, (doc, "near".to_string(), Value::null()));
        store.insert(far, (doc, "far".to_string(), Value::null()));

        let ctx = SearchContext {
            vector_index: &vectors,
            keyword_index: &keywords,
            embedder: &FixedEmbedder(vec![1.0, 0.0]),
            cipher: &PassthroughCipher,
            chunk_store: &FakeStore(store),
            expansion: None,
            reranker: None,
        };
        let mut request = SearchRequest::new("q", kb);
        request.hybrid_search = false;
        request.use_rerank = false;
        request.threshold = 0.5;
        let hits = search(&ctx, &request).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "near");
    }

    #[tokio::test]
    async fn rerank_without_client_is_an_internal_error() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let ctx = SearchContext {
            vector_index: &vectors,
            keyword_index: &keywords,
            embedder: &FixedEmbedder(vec![1.0]),
            cipher: &PassthroughCipher,
            chunk_store: &FakeStore(HashMap::new()),
            expansion: None,
            reranker: None,
        };
        let request = SearchRequest::new("q", kb);
        let err = search(&ctx, &request).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
