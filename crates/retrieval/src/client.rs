//! External model collaborators the retrieval service calls out to
//! (spec §4.4): a KB's configured embedding model, a small model for
//! query rewriting/expansion, and a cross-encoder for reranking.
//!
//! None of these are Moduly's concern to host — provider selection,
//! credential resolution, and the actual inference call are an
//! external collaborator per spec §1 ("individual node implementations
//! beyond their contracts"). These traits are the contract the search
//! pipeline depends on; `LLMService.get_client_for_user` in the
//! original retrieval service is the per-call-site client lookup this
//! generalizes.

use async_trait::async_trait;
use moduly_error::Error;

/// Computes a dense embedding for a piece of text against a KB's
/// configured model.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text, returning a vector whose dimension matches
    /// the owning KB's model.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error>;

    /// Embed a batch in one call where the provider supports it.
    ///
    /// The default implementation embeds sequentially; a real provider
    /// client overrides this to use its batch endpoint.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Rewrites or expands a user query using a small, cheap model (spec
/// §4.4 step 1).
#[async_trait]
pub trait QueryExpansionClient: Send + Sync {
    /// Produce a single search-optimized rewrite of `query`.
    async fn rewrite(&self, query: &str) -> Result<String, Error>;

    /// Produce `num_variations` differently-angled search queries.
    async fn expand(&self, query: &str, num_variations: usize) -> Result<Vec<String>, Error>;
}

/// Scores `(query, passage)` pairs with a cross-encoder (spec §4.4
/// step 4), highest score meaning most relevant.
#[async_trait]
pub trait RerankClient: Send + Sync {
    /// Score one batch of `(query, passage)` pairs, one score per
    /// input pair, in the same order.
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>, Error>;
}

/// Encrypts/decrypts chunk content at rest.
///
/// The actual symmetric envelope (Fernet-style) lives outside this
/// crate per spec §1's Non-goals; [`crate::decrypt::decrypt_content`]
/// is the part of the spec's decryption behavior this crate does own
/// — detecting ciphertext, calling through this trait, and degrading
/// to a placeholder on failure rather than failing the query.
#[async_trait]
pub trait ContentCipher: Send + Sync {
    /// Decrypt a single Fernet-token-shaped value. Implementations may
    /// fail; the caller is responsible for the placeholder fallback.
    async fn decrypt(&self, token: &str) -> Result<String, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn default_embed_batch_embeds_sequentially() {
        let client = FixedEmbedder(vec![1.0, 0.0]);
        let out = client
            .embed_batch(&["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v == &vec![1.0, 0.0]));
    }
}
