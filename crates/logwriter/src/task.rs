//! The `log.*` task shapes (spec §4.2, §6): one variant per task kind
//! the engine enqueues, parsed from the JSON payload it hands the
//! `log` queue.

use chrono::{DateTime, Utc};
use moduly_core::{NodeRunId, RunId};
use serde::Deserialize;
use serde_json::Value as Json;

/// A single `log.*` task, deserialized from its queue payload.
///
/// Tagged on the `kind` field the engine stamps every payload with, so
/// one `serde` derive replaces the hand-rolled dispatch the Python
/// services used per Celery task name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogTask {
    /// A run began executing.
    CreateRun {
        /// The run being created.
        run_id: RunId,
        /// The workflow (or deployment) this is a run of.
        workflow_id: String,
        /// The triggering user, if any.
        #[serde(default)]
        user_id: Option<String>,
        /// How the run was triggered.
        trigger_mode: Json,
        /// Initial status (always `running`).
        status: Json,
        /// The trigger payload.
        input: Json,
        /// When the run started.
        started_at: DateTime<Utc>,
    },
    /// A run finished successfully.
    UpdateRunFinish {
        /// The run that finished.
        run_id: RunId,
        /// Terminal status (always `success`).
        status: Json,
        /// The run's final output.
        output: Json,
        /// When the run finished.
        finished_at: DateTime<Utc>,
    },
    /// A run failed.
    UpdateRunError {
        /// The run that failed.
        run_id: RunId,
        /// Terminal status (always `failed`).
        status: Json,
        /// Human-readable error message.
        error_message: String,
        /// When the run failed.
        finished_at: DateTime<Utc>,
    },
    /// A node started executing.
    CreateNode {
        /// The run this node belongs to.
        run_id: RunId,
        /// The node-run's stable primary key.
        node_run_id: NodeRunId,
        /// Graph-local node id.
        node_id: String,
        /// The node's type tag.
        node_type: String,
        /// Initial status (always `running`).
        status: String,
        /// When the node started.
        started_at: DateTime<Utc>,
    },
    /// A node finished successfully.
    UpdateNodeFinish {
        /// The run this node belongs to.
        run_id: RunId,
        /// The node-run's stable primary key.
        node_run_id: NodeRunId,
        /// Terminal status (always `success`).
        status: String,
        /// When the node finished.
        finished_at: DateTime<Utc>,
    },
    /// A node failed.
    UpdateNodeError {
        /// The run this node belongs to.
        run_id: RunId,
        /// The node-run's stable primary key.
        node_run_id: NodeRunId,
        /// Terminal status (always `failed`).
        status: String,
        /// Human-readable error message.
        error_message: String,
        /// When the node failed.
        finished_at: DateTime<Utc>,
    },
}

impl LogTask {
    /// The run this task belongs to, every variant carries one.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        match self {
            Self::CreateRun { run_id, .. }
            | Self::UpdateRunFinish { run_id, .. }
            | Self::UpdateRunError { run_id, .. }
            | Self::CreateNode { run_id, .. }
            | Self::UpdateNodeFinish { run_id, .. }
            | Self::UpdateNodeError { run_id, .. } => *run_id,
        }
    }

    /// A short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRun { .. } => "create_run",
            Self::UpdateRunFinish { .. } => "update_run_finish",
            Self::UpdateRunError { .. } => "update_run_error",
            Self::CreateNode { .. } => "create_node",
            Self::UpdateNodeFinish { .. } => "update_node_finish",
            Self::UpdateNodeError { .. } => "update_node_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_run_parses_from_engine_payload_shape() {
        let run_id = RunId::v4();
        let payload = serde_json::json!({
            "kind": "create_run",
            "run_id": run_id.to_string(),
            "workflow_id": "wf-1",
            "user_id": null,
            "trigger_mode": "manual",
            "status": "running",
            "input": {"x": 1},
            "started_at": Utc::now().to_rfc3339(),
        });
        let task: LogTask = serde_json::from_value(payload).unwrap();
        assert_eq!(task.kind(), "create_run");
        assert_eq!(task.run_id(), run_id);
    }

    #[test]
    fn update_node_error_parses_from_engine_payload_shape() {
        let run_id = RunId::v4();
        let node_run_id = NodeRunId::v4();
        let payload = serde_json::json!({
            "kind": "update_node_error",
            "run_id": run_id.to_string(),
            "node_run_id": node_run_id.to_string(),
            "status": "failed",
            "error_message": "boom",
            "finished_at": Utc::now().to_rfc3339(),
        });
        let task: LogTask = serde_json::from_value(payload).unwrap();
        assert_eq!(task.kind(), "update_node_error");
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let payload = serde_json::json!({"kind": "bogus"});
        let result: Result<LogTask, _> = serde_json::from_value(payload);
        assert!(result.is_err());
    }
}
