//! Idempotency keys for `log.*` task handlers (spec §4.2, §7: "all task
//! handlers are idempotent so broker retries never double-write").

use std::collections::HashSet;
use std::fmt;

use moduly_core::{NodeRunId, RunId};
use serde::{Deserialize, Serialize};

/// A deterministic key identifying one logical upsert, so a broker retry
/// of the same `log.*` task is recognizable as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Key for a run-level upsert (`log.create_run`, `log.update_run_*`).
    #[must_use]
    pub fn for_run(run_id: RunId, kind: &str) -> Self {
        Self(format!("run:{run_id}:{kind}"))
    }

    /// Key for a node-run upsert, keyed by the engine-supplied PK rather
    /// than `(run_id, node_id)` so two distinct attempts at the same
    /// graph-local node id (a loop iteration, say) don't collide.
    #[must_use]
    pub fn for_node_run(node_run_id: NodeRunId, kind: &str) -> Self {
        Self(format!("node_run:{node_run_id}:{kind}"))
    }

    /// Borrow the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks which idempotency keys have already been applied, so the log
/// writer can recognize a broker-retried task without re-applying it.
#[derive(Debug, Default)]
pub struct IdempotencyManager {
    seen: HashSet<String>,
}

impl IdempotencyManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as seen. Returns `true` if this is the first time.
    pub fn check_and_mark(&mut self, key: &IdempotencyKey) -> bool {
        self.seen.insert(key.0.clone())
    }

    /// Check whether `key` has been seen, without marking it.
    #[must_use]
    pub fn is_seen(&self, key: &IdempotencyKey) -> bool {
        self.seen.contains(&key.0)
    }

    /// Number of distinct keys tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_keys_are_deterministic() {
        let run_id = RunId::v4();
        assert_eq!(
            IdempotencyKey::for_run(run_id, "update_run_finish"),
            IdempotencyKey::for_run(run_id, "update_run_finish")
        );
    }

    #[test]
    fn different_kinds_differ() {
        let run_id = RunId::v4();
        assert_ne!(
            IdempotencyKey::for_run(run_id, "create_run"),
            IdempotencyKey::for_run(run_id, "update_run_finish")
        );
    }

    #[test]
    fn check_and_mark_detects_duplicate() {
        let mut mgr = IdempotencyManager::new();
        let key = IdempotencyKey::for_run(RunId::v4(), "create_run");
        assert!(mgr.check_and_mark(&key));
        assert!(!mgr.check_and_mark(&key));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn node_run_key_uses_stable_pk() {
        let id = NodeRunId::v4();
        assert_eq!(
            IdempotencyKey::for_node_run(id, "update_node_finish").to_string(),
            format!("node_run:{id}:update_node_finish")
        );
    }
}
