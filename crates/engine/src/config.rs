//! Engine configuration (SPEC_FULL.md §1.3): concurrency gate width,
//! per-node and per-workflow timeouts, read from `MODULY_*` environment
//! variables with the literal defaults spec.md names.

use std::env;
use std::time::Duration;

/// Tunable engine parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Width of the concurrency gate (spec §4.1, default 10).
    pub concurrency_width: usize,
    /// Fallback per-node timeout when a node declares none (spec §4.1,
    /// default 300s) — normally taken from the node itself, this is the
    /// config-level fallback if a node somehow has none.
    pub default_node_timeout: Duration,
    /// Wall-clock budget for the whole run (spec §4.1, default 600s).
    pub workflow_timeout: Duration,
}

impl EngineConfig {
    fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(default_secs), Duration::from_secs)
    }

    fn env_usize(key: &str, default: usize) -> usize {
        env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    /// Build configuration from `MODULY_*` environment variables,
    /// falling back to spec.md's named defaults when unset or
    /// unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            concurrency_width: Self::env_usize("MODULY_ENGINE_CONCURRENCY", 10),
            default_node_timeout: Self::env_duration_secs("MODULY_ENGINE_NODE_TIMEOUT_SECS", 300),
            workflow_timeout: Self::env_duration_secs("MODULY_ENGINE_WORKFLOW_TIMEOUT_SECS", 600),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency_width: 10,
            default_node_timeout: Duration::from_secs(300),
            workflow_timeout: Duration::from_secs(600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.concurrency_width, 10);
        assert_eq!(config.default_node_timeout, Duration::from_secs(300));
        assert_eq!(config.workflow_timeout, Duration::from_secs(600));
    }
}
