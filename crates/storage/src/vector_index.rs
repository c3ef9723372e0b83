//! In-memory brute-force [`VectorIndex`] driver: the dense half of
//! hybrid retrieval (spec §4.4). Good enough for the data sizes a single
//! KB realistically holds in this workspace's scope; an ANN index is a
//! deployment-time driver swap, not something this crate needs to model.

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_core::{ChunkId, DocumentId, KnowledgeBaseId};
use moduly_ports::error::Result;
use moduly_ports::{VectorIndex, VectorRecord};

#[derive(Clone)]
struct Entry {
    document_id: DocumentId,
    vector: Vec<f32>,
}

/// In-memory cosine-similarity vector index, one bucket per KB.
#[derive(Default)]
pub struct MemoryVectorIndex {
    kbs: DashMap<KnowledgeBaseId, DashMap<ChunkId, Entry>>,
}

impl MemoryVectorIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, kb_id: KnowledgeBaseId, records: Vec<VectorRecord>) -> Result<()> {
        let bucket = self.kbs.entry(kb_id).or_default();
        for record in records {
            bucket.insert(
                record.chunk_id,
                Entry {
                    document_id: record.document_id,
                    vector: record.vector,
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        kb_id: KnowledgeBaseId,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkId, f32)>> {
        let Some(bucket) = self.kbs.get(&kb_id) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<(ChunkId, f32)> = bucket
            .iter()
            .map(|e| (*e.key(), cosine_similarity(vector, &e.value().vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_for_document(
        &self,
        kb_id: KnowledgeBaseId,
        document_id: DocumentId,
    ) -> Result<()> {
        if let Some(bucket) = self.kbs.get(&kb_id) {
            bucket.retain(|_, entry| entry.document_id != document_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_ranks_by_cosine_similarity() {
        let index = MemoryVectorIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let exact = ChunkId::v4();
        let orthogonal = ChunkId::v4();
        index
            .upsert(
                kb,
                vec![
                    VectorRecord {
                        chunk_id: exact,
                        document_id: doc,
                        vector: vec![1.0, 0.0],
                    },
                    VectorRecord {
                        chunk_id: orthogonal,
                        document_id: doc,
                        vector: vec![0.0, 1.0],
                    },
                ],
            )
            .await
            .unwrap();
        let results = index.query(kb, &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].0, exact);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn query_unknown_kb_returns_empty() {
        let index = MemoryVectorIndex::new();
        assert!(index
            .query(KnowledgeBaseId::v4(), &[1.0], 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_for_document_removes_only_its_chunks() {
        let index = MemoryVectorIndex::new();
        let kb = KnowledgeBaseId::v4();
        let keep_doc = DocumentId::v4();
        let remove_doc = DocumentId::v4();
        let keep_chunk = ChunkId::v4();
        index
            .upsert(
                kb,
                vec![
                    VectorRecord {
                        chunk_id: keep_chunk,
                        document_id: keep_doc,
                        vector: vec![1.0],
                    },
                    VectorRecord {
                        chunk_id: ChunkId::v4(),
                        document_id: remove_doc,
                        vector: vec![1.0],
                    },
                ],
            )
            .await
            .unwrap();
        index.delete_for_document(kb, remove_doc).await.unwrap();
        let results = index.query(kb, &[1.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, keep_chunk);
    }

    #[tokio::test]
    async fn top_k_truncates_results() {
        let index = MemoryVectorIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let records = (0..5)
            .map(|_| VectorRecord {
                chunk_id: ChunkId::v4(),
                document_id: doc,
                vector: vec![1.0, 0.0],
            })
            .collect();
        index.upsert(kb, records).await.unwrap();
        let results = index.query(kb, &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
