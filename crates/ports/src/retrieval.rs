//! Retrieval index ports.
//!
//! [`VectorIndex`] and [`KeywordIndex`] are the two halves of the
//! hybrid search described in spec §4.4: one dense vector per chunk,
//! one inverted text index per chunk, both scoped by KB id and
//! searched independently before fusion.

use async_trait::async_trait;
use moduly_core::{ChunkId, DocumentId, KnowledgeBaseId};
use moduly_value::Value;

use crate::error::Result;

/// One chunk's dense embedding, ready to upsert into a [`VectorIndex`].
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// The chunk this embedding belongs to.
    pub chunk_id: ChunkId,
    /// The document the chunk was extracted from.
    pub document_id: DocumentId,
    /// The dense embedding; dimension must match the owning KB's model.
    pub vector: Vec<f32>,
}

/// Port trait for the dense half of hybrid retrieval.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert (replace if present) a batch of chunk embeddings for a KB.
    async fn upsert(&self, kb_id: KnowledgeBaseId, records: Vec<VectorRecord>) -> Result<()>;

    /// Top-`k` nearest neighbors by cosine distance, closest first.
    async fn query(
        &self,
        kb_id: KnowledgeBaseId,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkId, f32)>>;

    /// Remove every chunk embedding belonging to a document (the
    /// delete half of the atomic swap in spec §4.4 step 4).
    async fn delete_for_document(
        &self,
        kb_id: KnowledgeBaseId,
        document_id: DocumentId,
    ) -> Result<()>;
}

/// One chunk's searchable text, ready to upsert into a [`KeywordIndex`].
#[derive(Debug, Clone)]
pub struct KeywordRecord {
    /// The chunk this text belongs to.
    pub chunk_id: ChunkId,
    /// The document the chunk was extracted from.
    pub document_id: DocumentId,
    /// `content` plus any extracted keyword phrases, concatenated, as
    /// described in spec §4.4 ("BM25-style rank over `content +
    /// keywords`").
    pub text: String,
    /// Structured metadata (page, original keyword list) carried
    /// through to the result's `metadata` field.
    pub metadata: Value,
}

/// Port trait for the sparse half of hybrid retrieval.
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    /// Upsert (replace if present) a batch of chunk text records for a KB.
    async fn upsert(&self, kb_id: KnowledgeBaseId, records: Vec<KeywordRecord>) -> Result<()>;

    /// Top-`k` matches by BM25-style score, highest first.
    async fn query(
        &self,
        kb_id: KnowledgeBaseId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<(ChunkId, f32)>>;

    /// Remove every chunk record belonging to a document.
    async fn delete_for_document(
        &self,
        kb_id: KnowledgeBaseId,
        document_id: DocumentId,
    ) -> Result<()>;
}

#[allow(dead_code)]
fn _assert_object_safe(_v: &dyn VectorIndex, _k: &dyn KeywordIndex) {}
