//! The `Run` record (spec §3): one invocation of a graph.

use chrono::{DateTime, Utc};
use moduly_core::{DeploymentId, RunId, TriggerMode, UserId, WorkflowId};
use moduly_error::Error;
use moduly_value::Value;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::transition::validate_run_transition;
use crate::usage::Usage;
use moduly_core::RunStatus;

/// One invocation of a graph, created when its task is accepted off the
/// `workflow` queue and mutated only by the Log Writer thereafter (spec
/// §3, §4.2 "Separation of concerns").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run.
    pub id: RunId,
    /// The workflow this run executes.
    pub workflow_id: WorkflowId,
    /// The user who owns this run.
    pub user_id: UserId,
    /// The deployment this run was invoked through, if any (vs. a direct
    /// workflow-editor "test run").
    #[serde(default)]
    pub deployment_id: Option<DeploymentId>,
    /// The deployment version frozen at run start.
    #[serde(default)]
    pub deployment_version: Option<Version>,
    /// How this run was triggered.
    pub trigger_mode: TriggerMode,
    /// Current status.
    pub status: RunStatus,
    /// The raw input payload the trigger node received.
    pub inputs: Value,
    /// The final output payload, set only once the run reaches a
    /// terminal status.
    #[serde(default)]
    pub outputs: Option<Value>,
    /// The error message, set only if `status == Failed`.
    #[serde(default)]
    pub error_message: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Aggregate token/cost usage across every node.
    #[serde(default)]
    pub usage: Usage,
}

impl Run {
    /// Create a freshly-started run.
    #[must_use]
    pub fn start(
        id: RunId,
        workflow_id: WorkflowId,
        user_id: UserId,
        trigger_mode: TriggerMode,
        inputs: Value,
    ) -> Self {
        Self {
            id,
            workflow_id,
            user_id,
            deployment_id: None,
            deployment_version: None,
            trigger_mode,
            status: RunStatus::Running,
            inputs,
            outputs: None,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
            usage: Usage::default(),
        }
    }

    /// Bind this run to the deployment it was invoked through.
    #[must_use]
    pub fn with_deployment(mut self, id: DeploymentId, version: Version) -> Self {
        self.deployment_id = Some(id);
        self.deployment_version = Some(version);
        self
    }

    /// Transition to `Success`, recording the final outputs.
    pub fn finish_success(&mut self, outputs: Value) -> Result<(), Error> {
        validate_run_transition(self.status, RunStatus::Success)?;
        self.status = RunStatus::Success;
        self.outputs = Some(outputs);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Transition to `Failed`, recording the originating error message.
    pub fn finish_failed(&mut self, error_message: impl Into<String>) -> Result<(), Error> {
        validate_run_transition(self.status, RunStatus::Failed)?;
        self.status = RunStatus::Failed;
        self.error_message = Some(error_message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Transition to `Stopped` by explicit user action.
    pub fn stop(&mut self) -> Result<(), Error> {
        validate_run_transition(self.status, RunStatus::Stopped)?;
        self.status = RunStatus::Stopped;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Duration in fractional seconds, once terminal (spec §9 open
    /// question (a)): derived from `finished_at - started_at`, never
    /// stored redundantly.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moduly_core::{RunId, UserId, WorkflowId};

    fn new_run() -> Run {
        Run::start(
            RunId::v4(),
            WorkflowId::v4(),
            UserId::v4(),
            TriggerMode::Manual,
            Value::new(serde_json::json!({"x": 1})),
        )
    }

    #[test]
    fn starts_running_with_no_finish_time() {
        let run = new_run();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());
        assert!(run.duration_seconds().is_none());
    }

    #[test]
    fn finish_success_sets_outputs_and_timestamp() {
        let mut run = new_run();
        run.finish_success(Value::new(serde_json::json!({"y": 2}))).unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert!(run.outputs.is_some());
        assert!(run.finished_at.unwrap() >= run.started_at);
        assert!(run.duration_seconds().unwrap() >= 0.0);
    }

    #[test]
    fn finish_failed_sets_error_message() {
        let mut run = new_run();
        run.finish_failed("node X failed").unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("node X failed"));
    }

    #[test]
    fn double_finish_is_rejected() {
        let mut run = new_run();
        run.finish_success(Value::null()).unwrap();
        let err = run.finish_failed("too late").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn stop_is_a_valid_terminal_transition() {
        let mut run = new_run();
        run.stop().unwrap();
        assert_eq!(run.status, RunStatus::Stopped);
    }
}
