//! Distributed lock port.
//!
//! A TTL-bounded named lock held in a key/value store, used by the
//! retrieval service's ingestion path so two workers never re-embed
//! the same document concurrently (spec §5, "Distributed locks").
//! Shaped after the teacher's per-execution lease
//! (`acquire_lease`/`renew_lease`/`release_lease`), generalized from
//! one execution id to an arbitrary named resource.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// The default lock duration for document-level ingestion (spec §5).
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(120);

/// Port trait for named, TTL-bounded, holder-scoped distributed locks.
#[async_trait]
pub trait Lease: Send + Sync {
    /// Attempt to acquire `name` for `holder`. Returns `true` if
    /// acquired or already held by `holder`; `false` if held by a
    /// different holder whose lease has not expired.
    async fn acquire(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool>;

    /// Extend an already-held lease. Returns `false` if `holder` does
    /// not currently hold `name`.
    async fn renew(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool>;

    /// Release a held lease. Returns `false` if `holder` does not
    /// currently hold `name`.
    async fn release(&self, name: &str, holder: &str) -> Result<bool>;
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn Lease) {}
