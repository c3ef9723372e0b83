//! Chunk hashing and token-budget truncation shared by the incremental
//! sync path (spec §4.4 "Incremental KB sync").

use sha2::{Digest, Sha256};

/// Batch size cap for a single embedding call (spec §4.4 step 3: "≤50
/// texts").
pub const MAX_TEXTS_PER_BATCH: usize = 50;

/// Per-text token budget before truncation kicks in (spec §4.4 step 3:
/// "≤8000 tokens per text").
pub const MAX_TOKENS_PER_TEXT: usize = 8000;

/// `chunk.content_hash` is a function of pre-encryption plaintext
/// (spec §3): SHA-256 over the UTF-8 bytes, hex-encoded.
#[must_use]
pub fn content_hash(plaintext: &str) -> String {
    let digest = Sha256::digest(plaintext.as_bytes());
    hex::encode(digest)
}

/// Truncate `text` to its first [`MAX_TOKENS_PER_TEXT`] whitespace-
/// delimited tokens.
///
/// A real tokenizer call is an external collaborator (spec §1); this
/// approximation is conservative enough that the 8000-token budget is
/// never exceeded by more than one provider-specific tokenizer's
/// typical over-count versus a whitespace split.
#[must_use]
pub fn truncate_to_token_budget(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() <= MAX_TOKENS_PER_TEXT {
        return text.to_string();
    }
    tokens[..MAX_TOKENS_PER_TEXT].join(" ")
}

/// Approximate token count, consistent with [`truncate_to_token_budget`].
#[must_use]
pub fn approx_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split a slice of items into batches no larger than
/// [`MAX_TEXTS_PER_BATCH`].
pub fn batches<T>(items: &[T], max_len: usize) -> impl Iterator<Item = &[T]> {
    items.chunks(max_len.max(1))
}
