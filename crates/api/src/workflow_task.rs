//! The `workflow.execute` task contract (spec §4.2, §6): the gateway
//! serializes one of these onto the `workflow` queue and the workflow
//! worker deserializes it back, so the two never need to share a Rust
//! type beyond this module.

use chrono::{DateTime, Utc};
use moduly_core::{TriggerMode, UserId, WorkflowId};
use moduly_value::Value;
use moduly_workflow::Graph;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to execute one run, plus the run-level
/// metadata the Log Writer's `Run` row is stamped with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecuteTask {
    /// The run id the gateway generated before enqueuing.
    pub run_id: moduly_core::RunId,
    /// The workflow (or deployment) this is a run of.
    pub workflow_id: WorkflowId,
    /// The frozen graph to execute.
    pub graph: Graph,
    /// The trigger payload.
    pub inputs: Value,
    /// The user who triggered the run, if any.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// How the run was triggered.
    pub trigger_mode: TriggerMode,
    /// When this task was enqueued.
    pub enqueued_at: DateTime<Utc>,
}
