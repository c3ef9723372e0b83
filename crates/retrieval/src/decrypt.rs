//! Chunk content decryption on read (spec §4.4 "Chunk decryption"):
//! detect the Fernet token prefix, decrypt through a
//! [`ContentCipher`], and degrade to a placeholder rather than fail
//! the query on a single corrupt row. Ported from
//! `RetrievalService._decrypt_content`'s whole-value and inline
//! `key: value` patterns.

use regex::Regex;
use std::sync::LazyLock;

use crate::client::ContentCipher;

/// Every Fernet token starts with this base64url-encoded version byte
/// (spec §4.4: "the Fernet token prefix `gAAAAAB`").
pub const FERNET_PREFIX: &str = "gAAAAAB";

/// Returned in place of content that failed to decrypt, so one corrupt
/// row never fails the whole search.
pub const PLACEHOLDER: &str = "[ENCRYPTED CONTENT]";

static INLINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\w]+):\s*(gAAAAAB[A-Za-z0-9_\-]+=*)").expect("static regex is valid")
});

/// Decrypt `content`, handling both whole-value encryption and inline
/// `key: gAAAAAB...` patterns, falling back to [`PLACEHOLDER`] (or
/// `key: [ENCRYPTED]` for an inline match) on failure.
pub async fn decrypt_content(cipher: &dyn ContentCipher, content: &str) -> String {
    if content.is_empty() {
        return content.to_string();
    }

    if content.starts_with(FERNET_PREFIX) {
        return match cipher.decrypt(content).await {
            Ok(plain) => plain,
            Err(error) => {
                tracing::warn!(%error, "failed to decrypt full chunk content");
                PLACEHOLDER.to_string()
            }
        };
    }

    let matches: Vec<(std::ops::Range<usize>, String, String)> = INLINE_PATTERN
        .captures_iter(content)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let key = caps[1].to_string();
            let token = caps[2].to_string();
            (whole.range(), key, token)
        })
        .collect();

    if matches.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for (range, key, token) in matches {
        out.push_str(&content[cursor..range.start]);
        match cipher.decrypt(&token).await {
            Ok(plain) => out.push_str(&format!("{key}: {plain}")),
            Err(error) => {
                tracing::warn!(%error, key, "failed to decrypt inline chunk field");
                out.push_str(&format!("{key}: [ENCRYPTED]"));
            }
        }
        cursor = range.end;
    }
    out.push_str(&content[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use moduly_error::Error;

    struct Reversing;

    #[async_trait]
    impl ContentCipher for Reversing {
        async fn decrypt(&self, token: &str) -> Result<String, Error> {
            Ok(token.chars().rev().collect())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl ContentCipher for AlwaysFails {
        async fn decrypt(&self, _token: &str) -> Result<String, Error> {
            Err(Error::Internal("boom".into()))
        }
    }

    #[tokio::test]
    async fn plaintext_passes_through_unchanged() {
        let out = decrypt_content(&Reversing, "hello world").await;
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn empty_content_passes_through() {
        assert_eq!(decrypt_content(&Reversing, "").await, "");
    }

    #[tokio::test]
    async fn whole_value_encryption_is_decrypted() {
        let out = decrypt_content(&Reversing, "gAAAAABabc").await;
        assert_eq!(out, "gAAAAABabc".chars().rev().collect::<String>());
    }

    #[tokio::test]
    async fn whole_value_decryption_failure_yields_placeholder() {
        let out = decrypt_content(&AlwaysFails, "gAAAAABabc").await;
        assert_eq!(out, PLACEHOLDER);
    }

    #[tokio::test]
    async fn inline_pattern_decrypts_only_the_matched_field() {
        let content = "name: Alice, secret: gAAAAABxyz, note: plain";
        let out = decrypt_content(&Reversing, content).await;
        assert!(out.starts_with("name: Alice, secret: "));
        assert!(out.ends_with(", note: plain"));
        assert!(!out.contains("gAAAAAB"));
    }

    #[tokio::test]
    async fn inline_decryption_failure_yields_keyed_placeholder() {
        let content = "secret: gAAAAABxyz";
        let out = decrypt_content(&AlwaysFails, content).await;
        assert_eq!(out, "secret: [ENCRYPTED]");
    }
}
