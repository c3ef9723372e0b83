//! Multi-tenancy scope levels and trigger/run enumerations shared across
//! crates, so the graph, execution, and sandbox layers agree on a single
//! vocabulary instead of each re-declaring their own string constants.

use serde::{Deserialize, Serialize};

use crate::id::TenantId;

/// The scope a resource or credential is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "level", content = "id")]
pub enum ScopeLevel {
    /// Visible platform-wide.
    Global,
    /// Scoped to one tenant.
    Tenant(TenantId),
}

/// How a run was triggered (spec §3's `trigger_mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Started by a human through the run API.
    Manual,
    /// Started by an API caller (async or sync run endpoint).
    Api,
    /// Started by a cron schedule.
    Schedule,
}

/// The terminal-or-not status of a `Run` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still executing.
    Running,
    /// Reached a terminal successful state.
    Success,
    /// Reached a terminal failed state.
    Failed,
    /// Stopped by explicit user action before completion.
    Stopped,
}

impl RunStatus {
    /// Returns `true` for any of the three terminal statuses.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// The status of one `NodeRun` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRunStatus {
    /// Currently executing.
    Running,
    /// Finished without error.
    Success,
    /// Finished with an error.
    Failed,
    /// Never started because the run failed or was cancelled first.
    Skipped,
}

impl NodeRunStatus {
    /// Returns `true` if this node will never transition further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_terminal() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }

    #[test]
    fn node_run_status_terminal() {
        assert!(!NodeRunStatus::Running.is_terminal());
        assert!(NodeRunStatus::Success.is_terminal());
        assert!(NodeRunStatus::Skipped.is_terminal());
    }

    #[test]
    fn scope_level_serde() {
        let g = ScopeLevel::Global;
        let json = serde_json::to_string(&g).unwrap();
        let back: ScopeLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(g, back);
    }
}
