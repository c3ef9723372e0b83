//! The `NodeRun` record (spec §3): one node's execution within a run.
//!
//! The primary key is generated by the engine *before* `node_start` is
//! emitted (spec §3, §9b), so that a later `node_finish`/`error` event
//! upserts the same row regardless of delivery order — see
//! `moduly-logwriter` for the idempotent-upsert consumer of this type.

use chrono::{DateTime, Utc};
use moduly_core::{NodeRunId, NodeRunStatus, RunId};
use moduly_error::Error;
use moduly_value::Value;
use serde::{Deserialize, Serialize};

use crate::transition::validate_node_run_transition;

/// One node's execution within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRun {
    /// Engine-generated primary key, stable across every upsert for this
    /// node within this run.
    pub id: NodeRunId,
    /// The run this node execution belongs to.
    pub run_id: RunId,
    /// Graph-local node id (not globally unique; unique only within the
    /// owning run's graph).
    pub node_id: String,
    /// The node's type tag, e.g. `"httpRequest"`.
    pub node_type: String,
    /// Current status.
    pub status: NodeRunStatus,
    /// Snapshot of the node's resolved inputs at the moment it started.
    pub inputs: Value,
    /// Snapshot of the node's outputs, set once terminal and successful.
    #[serde(default)]
    pub outputs: Option<Value>,
    /// Snapshot of the node's configuration ("process data") as it stood
    /// at execution time, independent of any later graph edits.
    pub process_data: Value,
    /// Error message, set only if `status == Failed`.
    #[serde(default)]
    pub error_message: Option<String>,
    /// When this node started executing. Included in every upsert
    /// payload (spec §3) so a late-arriving "create" after an earlier
    /// "update" can still reconstruct a complete row.
    pub started_at: DateTime<Utc>,
    /// When this node reached a terminal status.
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl NodeRun {
    /// Create a freshly-started node run. `id` must be generated by the
    /// engine ahead of the `node_start` event, not by this constructor,
    /// so that repeated calls for the same logical start don't diverge.
    #[must_use]
    pub fn start(
        id: NodeRunId,
        run_id: RunId,
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        inputs: Value,
        process_data: Value,
    ) -> Self {
        Self {
            id,
            run_id,
            node_id: node_id.into(),
            node_type: node_type.into(),
            status: NodeRunStatus::Running,
            inputs,
            outputs: None,
            process_data,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Transition to `Success`, recording the node's outputs.
    pub fn finish_success(&mut self, outputs: Value) -> Result<(), Error> {
        validate_node_run_transition(self.status, NodeRunStatus::Success)?;
        self.status = NodeRunStatus::Success;
        self.outputs = Some(outputs);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Transition to `Failed`, recording the error message.
    pub fn finish_failed(&mut self, error_message: impl Into<String>) -> Result<(), Error> {
        validate_node_run_transition(self.status, NodeRunStatus::Failed)?;
        self.status = NodeRunStatus::Failed;
        self.error_message = Some(error_message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Transition to `Skipped` (never started because a sibling failure
    /// cancelled the run first).
    pub fn finish_skipped(&mut self) -> Result<(), Error> {
        validate_node_run_transition(self.status, NodeRunStatus::Skipped)?;
        self.status = NodeRunStatus::Skipped;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Merge a later snapshot of the same logical row into this one
    /// (spec §8 "Node upsert" invariant): the result is the row whose
    /// `finished_at` is latest, falling back to whichever snapshot has
    /// one at all.
    #[must_use]
    pub fn merge_later(self, other: Self) -> Self {
        match (self.finished_at, other.finished_at) {
            (Some(a), Some(b)) if a >= b => self,
            (Some(_), Some(_)) => other,
            (Some(_), None) => self,
            (None, Some(_)) => other,
            (None, None) => other, // no finish info on either: prefer the newer message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moduly_core::{NodeRunId, RunId};

    fn new_node_run() -> NodeRun {
        NodeRun::start(
            NodeRunId::v4(),
            RunId::v4(),
            "n1",
            "httpRequest",
            Value::null(),
            Value::null(),
        )
    }

    #[test]
    fn starts_running() {
        let nr = new_node_run();
        assert_eq!(nr.status, NodeRunStatus::Running);
        assert!(nr.finished_at.is_none());
    }

    #[test]
    fn finish_success_sets_outputs() {
        let mut nr = new_node_run();
        nr.finish_success(Value::new(serde_json::json!({"ok": true}))).unwrap();
        assert_eq!(nr.status, NodeRunStatus::Success);
        assert!(nr.outputs.is_some());
    }

    #[test]
    fn merge_later_prefers_finished_over_running() {
        let id = NodeRunId::v4();
        let run_id = RunId::v4();
        let create = NodeRun::start(id, run_id, "n1", "httpRequest", Value::null(), Value::null());
        let mut finish = create.clone();
        finish.finish_success(Value::null()).unwrap();

        // duplicate/reordered "create" message arriving after "finish" must not
        // revert the row to Running.
        let merged = finish.clone().merge_later(create);
        assert_eq!(merged.status, NodeRunStatus::Success);
    }

    #[test]
    fn merge_later_picks_latest_finish_timestamp() {
        let id = NodeRunId::v4();
        let run_id = RunId::v4();
        let mut earlier = NodeRun::start(id, run_id, "n1", "httpRequest", Value::null(), Value::null());
        earlier.finish_failed("first error").unwrap();
        let mut later = earlier.clone();
        later.finished_at = Some(earlier.finished_at.unwrap() + chrono::Duration::seconds(1));
        later.error_message = Some("second error".into());

        let merged = earlier.merge_later(later);
        assert_eq!(merged.error_message.as_deref(), Some("second error"));
    }
}
