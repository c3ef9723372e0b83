//! The context an [`Action`](crate::Action) receives on each invocation
//! (spec §4.1: "each node's `_run` receives the results view, its own
//! configuration, and a cancellation signal").

use std::time::Duration;

use moduly_core::{NodeRunId, RunId};
use moduly_value::Value;
use tokio_util::sync::CancellationToken;

/// Everything an [`Action`](crate::Action) needs to execute one node
/// attempt.
///
/// `inputs` is the resolved results-map snapshot for this node (already
/// walked through its selectors by the engine), not the raw graph of
/// ancestor outputs — the action never resolves selectors itself.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// The run this node attempt belongs to.
    pub run_id: RunId,
    /// The primary key the engine generated for this node attempt before
    /// emitting `node_start`.
    pub node_run_id: NodeRunId,
    /// Graph-local node id.
    pub node_id: String,
    /// The node's type tag, used for logging and metrics.
    pub node_type: String,
    /// The resolved input payload for this node (selectors already
    /// applied by the engine).
    pub inputs: Value,
    /// The node's static configuration (`data` in the graph document).
    pub config: Value,
    /// Wall-clock budget for this single attempt.
    pub timeout: Duration,
    /// Cancelled by the engine on fail-fast, on workflow timeout, or when
    /// the run is cancelled by its caller.
    pub cancellation: CancellationToken,
}

impl ActionContext {
    /// Returns `true` if the run has been cancelled and the action
    /// should stop as soon as it reaches a checkpoint.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActionContext {
        ActionContext {
            run_id: RunId::v4(),
            node_run_id: NodeRunId::v4(),
            node_id: "n1".into(),
            node_type: "httpRequest".into(),
            inputs: Value::null(),
            config: Value::null(),
            timeout: Duration::from_secs(30),
            cancellation: CancellationToken::new(),
        }
    }

    #[test]
    fn not_cancelled_initially() {
        assert!(!ctx().is_cancelled());
    }

    #[test]
    fn cancellation_observed_after_cancel() {
        let context = ctx();
        context.cancellation.cancel();
        assert!(context.is_cancelled());
    }
}
