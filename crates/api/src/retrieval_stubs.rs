//! Dev-mode stand-ins for the retrieval core's external collaborators
//! (spec §1: embedding/rewrite/rerank providers and the content cipher
//! are external collaborators, not Moduly's concern to host).
//!
//! These mirror `moduly-retrieval`'s own `FixedEmbedder` test fixture
//! and the sandbox crate's `bypass_isolation` dev escape hatch: a
//! deterministic, provider-free implementation of each trait so the
//! `/v1/retrieval/*` endpoints are exercisable without a real model
//! deployment, never intended for production use.

use std::collections::HashMap;

use async_trait::async_trait;
use moduly_core::{ChunkId, DocumentId};
use moduly_error::Error;
use moduly_retrieval::{ChunkStore, ContentCipher, EmbeddingClient, QueryExpansionClient, RerankClient};
use moduly_value::Value;
use parking_lot::RwLock;

/// A deterministic hash-based embedding: stable across calls, useless
/// for real semantic search, sufficient to exercise the fusion and
/// ranking pipeline end to end.
pub struct HashEmbeddingClient {
    dims: usize,
}

impl HashEmbeddingClient {
    /// Build a client producing `dims`-dimensional vectors.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let mut vector = vec![0.0_f32; self.dims];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dims] += f32::from(byte) / 255.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

/// Passes content through unchanged; no real encryption envelope is
/// configured in dev mode.
#[derive(Default)]
pub struct PassthroughCipher;

#[async_trait]
impl ContentCipher for PassthroughCipher {
    async fn decrypt(&self, token: &str) -> Result<String, Error> {
        Ok(token.to_string())
    }
}

/// No-op query expansion: returns the query unchanged, and repeats it
/// `num_variations` times for the multi-query path.
#[derive(Default)]
pub struct IdentityExpansionClient;

#[async_trait]
impl QueryExpansionClient for IdentityExpansionClient {
    async fn rewrite(&self, query: &str) -> Result<String, Error> {
        Ok(query.to_string())
    }

    async fn expand(&self, query: &str, num_variations: usize) -> Result<Vec<String>, Error> {
        Ok(std::iter::repeat_with(|| query.to_string()).take(num_variations.max(1)).collect())
    }
}

/// Scores every pair by content length overlap rather than a real
/// cross-encoder, enough to produce a stable, non-trivial ordering.
#[derive(Default)]
pub struct LengthOverlapReranker;

#[async_trait]
impl RerankClient for LengthOverlapReranker {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, Error> {
        Ok(pairs
            .iter()
            .map(|(query, passage)| {
                let query_words: std::collections::HashSet<&str> = query.split_whitespace().collect();
                let overlap = passage.split_whitespace().filter(|w| query_words.contains(w)).count();
                overlap as f32
            })
            .collect())
    }
}

/// An in-memory row store backing [`ChunkStore`], populated by the
/// sync endpoint and read by the search endpoint.
#[derive(Default)]
pub struct MemoryChunkStore {
    rows: RwLock<HashMap<ChunkId, (DocumentId, String, Value)>>,
}

impl MemoryChunkStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one chunk's row data.
    pub fn put(&self, chunk_id: ChunkId, document_id: DocumentId, content: String, metadata: Value) {
        self.rows.write().insert(chunk_id, (document_id, content, metadata));
    }

    /// Remove every row belonging to a document, for the sync
    /// endpoint's delete-then-insert swap.
    pub fn remove_document(&self, document_id: DocumentId) {
        self.rows.write().retain(|_, (doc, _, _)| *doc != document_id);
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn fetch(&self, chunk_ids: &[ChunkId]) -> Result<HashMap<ChunkId, (DocumentId, String, Value)>, Error> {
        let rows = self.rows.read();
        Ok(chunk_ids.iter().filter_map(|id| rows.get(id).cloned().map(|v| (*id, v))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedding_is_deterministic() {
        let client = HashEmbeddingClient::new(8);
        let a = client.embed("hello world").await.unwrap();
        let b = client.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn identity_expansion_repeats_query() {
        let client = IdentityExpansionClient;
        let variants = client.expand("find the bug", 3).await.unwrap();
        assert_eq!(variants, vec!["find the bug"; 3]);
    }

    #[tokio::test]
    async fn memory_chunk_store_roundtrips() {
        let store = MemoryChunkStore::new();
        let chunk_id = ChunkId::v4();
        let document_id = DocumentId::v4();
        store.put(chunk_id, document_id, "hello".into(), Value::null());
        let fetched = store.fetch(&[chunk_id]).await.unwrap();
        assert_eq!(fetched.get(&chunk_id).unwrap().1, "hello");
    }
}
