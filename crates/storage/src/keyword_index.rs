//! In-memory [`KeywordIndex`] driver: the sparse half of hybrid
//! retrieval, a BM25-style rank over `content + keywords` (spec §4.4).

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_core::{ChunkId, DocumentId, KnowledgeBaseId};
use moduly_ports::error::Result;
use moduly_ports::{KeywordIndex, KeywordRecord};
use moduly_value::Value;

const K1: f32 = 1.2;
const B: f32 = 0.75;

#[derive(Clone)]
struct Entry {
    document_id: DocumentId,
    terms: Vec<String>,
    metadata: Value,
}

/// In-memory BM25-style inverted index, one bucket per KB.
#[derive(Default)]
pub struct MemoryKeywordIndex {
    kbs: DashMap<KnowledgeBaseId, DashMap<ChunkId, Entry>>,
}

impl MemoryKeywordIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn bm25_score(query_terms: &[String], doc_terms: &[String], avg_len: f32, df: &HashMap<&str, usize>, n_docs: usize) -> f32 {
    if doc_terms.is_empty() {
        return 0.0;
    }
    let doc_len = doc_terms.len() as f32;
    let mut score = 0.0;
    for term in query_terms {
        let term_freq = doc_terms.iter().filter(|t| *t == term).count() as f32;
        if term_freq == 0.0 {
            continue;
        }
        let doc_freq = *df.get(term.as_str()).unwrap_or(&0) as f32;
        let idf = ((n_docs as f32 - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln();
        let numerator = term_freq * (K1 + 1.0);
        let denominator = term_freq + K1 * (1.0 - B + B * doc_len / avg_len.max(1.0));
        score += idf * numerator / denominator;
    }
    score
}

#[async_trait]
impl KeywordIndex for MemoryKeywordIndex {
    async fn upsert(&self, kb_id: KnowledgeBaseId, records: Vec<KeywordRecord>) -> Result<()> {
        let bucket = self.kbs.entry(kb_id).or_default();
        for record in records {
            bucket.insert(
                record.chunk_id,
                Entry {
                    document_id: record.document_id,
                    terms: tokenize(&record.text),
                    metadata: record.metadata,
                },
            );
        }
        Ok(())
    }

    async fn query(&self, kb_id: KnowledgeBaseId, query: &str, top_k: usize) -> Result<Vec<(ChunkId, f32)>> {
        let Some(bucket) = self.kbs.get(&kb_id) else {
            return Ok(Vec::new());
        };
        let query_terms = tokenize(query);
        if query_terms.is_empty() || bucket.is_empty() {
            return Ok(Vec::new());
        }
        let n_docs = bucket.len();
        let avg_len = bucket.iter().map(|e| e.value().terms.len()).sum::<usize>() as f32 / n_docs as f32;

        let mut df: HashMap<&str, usize> = HashMap::new();
        for term in &query_terms {
            let count = bucket
                .iter()
                .filter(|e| e.value().terms.contains(term))
                .count();
            df.insert(term.as_str(), count);
        }

        let mut scored: Vec<(ChunkId, f32)> = bucket
            .iter()
            .map(|e| {
                (
                    *e.key(),
                    bm25_score(&query_terms, &e.value().terms, avg_len, &df, n_docs),
                )
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_for_document(&self, kb_id: KnowledgeBaseId, document_id: DocumentId) -> Result<()> {
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
    async fn query_ranks_exact_term_match_highest() {
        let index = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let matching = ChunkId::v4();
        let unrelated = ChunkId::v4();
        index
            .upsert(
                kb,
                vec![
                    KeywordRecord {
                        chunk_id: matching,
                        document_id: doc,
                        text: "rust async runtime scheduling".into(),
                        metadata: Value::null(),
                    },
                    KeywordRecord {
                        chunk_id: unrelated,
                        document_id: doc,
                        text: "cooking pasta recipes".into(),
                        metadata: Value::null(),
                    },
                ],
            )
            .await
            .unwrap();
        let results = index.query(kb, "async runtime", 5).await.unwrap();
        assert_eq!(results[0].0, matching);
    }

    #[tokio::test]
    async fn query_with_no_matches_returns_empty() {
        let index = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        index
            .upsert(
                kb,
                vec![KeywordRecord {
                    chunk_id: ChunkId::v4(),
                    document_id: DocumentId::v4(),
                    text: "alpha beta".into(),
                    metadata: Value::null(),
                }],
            )
            .await
            .unwrap();
        assert!(index.query(kb, "gamma delta", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_for_document_removes_its_chunks() {
        let index = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        index
            .upsert(
                kb,
                vec![KeywordRecord {
                    chunk_id: ChunkId::v4(),
                    document_id: doc,
                    text: "alpha beta".into(),
                    metadata: Value::null(),
                }],
            )
            .await
            .unwrap();
        index.delete_for_document(kb, doc).await.unwrap();
        assert!(index.query(kb, "alpha", 5).await.unwrap().is_empty());
    }
}
