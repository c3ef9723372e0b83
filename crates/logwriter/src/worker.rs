//! The Log Writer worker (spec §4.2, §7): dequeues `log.*` tasks and
//! applies them through a [`RunRepo`], retrying an update that races
//! ahead of its parent's create with a bounded backoff before dropping
//! it, and keeping only the latest-`finished_at` node-run row across
//! arbitrary duplication or reordering (spec §8 "Node upsert").

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moduly_core::{NodeRunId, RunId};
use moduly_error::Error;
use moduly_ports::{RunRepo, TaskQueue};
use moduly_resilience::{retry, RetriesExhausted, RetryPolicy};
use moduly_value::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::task::LogTask;

/// Applies `log.*` tasks to a [`RunRepo`], and optionally pulls them off
/// a [`TaskQueue`] in a standalone worker loop.
pub struct LogWriter {
    run_repo: Arc<dyn RunRepo>,
    retry_policy: RetryPolicy,
}

#[derive(Debug)]
enum Wait<T> {
    Missing,
    Real(T),
}

impl LogWriter {
    /// Build a log writer over a run repository, using the spec's
    /// default missing-parent retry policy (base 50ms, cap 500ms, 8
    /// attempts).
    #[must_use]
    pub fn new(run_repo: Arc<dyn RunRepo>) -> Self {
        Self {
            run_repo,
            retry_policy: RetryPolicy::log_write_missing_parent(),
        }
    }

    /// Override the missing-parent retry policy (tests use a tighter one).
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Apply one `log.*` task. Idempotent: re-applying the same task
    /// (broker at-least-once redelivery) never double-writes or
    /// regresses a row past a later one already persisted.
    pub async fn apply(&self, task: LogTask) -> Result<(), Error> {
        match task {
            LogTask::CreateRun {
                run_id,
                workflow_id,
                user_id,
                trigger_mode,
                status,
                input,
                started_at,
            } => {
                self.run_repo
                    .upsert_run(
                        run_id,
                        Value::new(serde_json::json!({
                            "workflow_id": workflow_id,
                            "user_id": user_id,
                            "trigger_mode": trigger_mode,
                            "status": status,
                            "input": input,
                            "started_at": started_at,
                        })),
                    )
                    .await
            }
            LogTask::UpdateRunFinish {
                run_id,
                status,
                output,
                finished_at,
            } => {
                self.wait_for_run(run_id).await?;
                self.run_repo
                    .upsert_run(
                        run_id,
                        Value::new(serde_json::json!({
                            "status": status,
                            "output": output,
                            "finished_at": finished_at,
                        })),
                    )
                    .await
            }
            LogTask::UpdateRunError {
                run_id,
                status,
                error_message,
                finished_at,
            } => {
                self.wait_for_run(run_id).await?;
                self.run_repo
                    .upsert_run(
                        run_id,
                        Value::new(serde_json::json!({
                            "status": status,
                            "error_message": error_message,
                            "finished_at": finished_at,
                        })),
                    )
                    .await
            }
            LogTask::CreateNode {
                run_id,
                node_run_id,
                node_id,
                node_type,
                status,
                started_at,
            } => {
                self.run_repo
                    .upsert_node_run(
                        node_run_id,
                        run_id,
                        Value::new(serde_json::json!({
                            "node_id": node_id,
                            "node_type": node_type,
                            "status": status,
                            "started_at": started_at,
                        })),
                    )
                    .await
            }
            LogTask::UpdateNodeFinish {
                run_id,
                node_run_id,
                status,
                finished_at,
            } => {
                self.apply_node_update(
                    run_id,
                    node_run_id,
                    finished_at,
                    serde_json::json!({"status": status, "finished_at": finished_at}),
                )
                .await
            }
            LogTask::UpdateNodeError {
                run_id,
                node_run_id,
                status,
                error_message,
                finished_at,
            } => {
                self.apply_node_update(
                    run_id,
                    node_run_id,
                    finished_at,
                    serde_json::json!({
                        "status": status,
                        "error_message": error_message,
                        "finished_at": finished_at,
                    }),
                )
                .await
            }
        }
    }

    /// Apply a node-run update, keeping the row whose `finished_at` is
    /// latest no matter the arrival order (spec §8 "Node upsert").
    async fn apply_node_update(
        &self,
        run_id: RunId,
        node_run_id: NodeRunId,
        incoming_finished_at: DateTime<Utc>,
        fields: serde_json::Value,
    ) -> Result<(), Error> {
        let existing = self.wait_for_node(run_id, node_run_id).await?;
        let existing_finished_at = existing
            .get_path(&["finished_at"])
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        if let Some(existing_finished_at) = existing_finished_at {
            if existing_finished_at >= incoming_finished_at {
                return Ok(());
            }
        }
        self.run_repo
            .upsert_node_run(node_run_id, run_id, Value::new(fields))
            .await
    }

    async fn wait_for_run(&self, run_id: RunId) -> Result<Value, Error> {
        let outcome = retry(
            self.retry_policy,
            |wait: &Wait<Error>| matches!(wait, Wait::Missing),
            || async {
                match self.run_repo.get_run(run_id).await {
                    Ok(Some(row)) => Ok(row),
                    Ok(None) => Err(Wait::Missing),
                    Err(error) => Err(Wait::Real(error)),
                }
            },
        )
        .await;
        match outcome {
            Ok(row) => Ok(row),
            Err(Ok(Wait::Real(error))) => Err(error),
            Err(Ok(Wait::Missing)) | Err(Err(RetriesExhausted { .. })) => {
                let attempts = self.retry_policy.max_attempts();
                warn!(%run_id, attempts, "dropping run update with no durable parent create");
                Err(Error::LogWriteMissingParent {
                    entity: "run",
                    id: run_id.to_string(),
                    attempts,
                })
            }
        }
    }

    async fn wait_for_node(&self, run_id: RunId, node_run_id: NodeRunId) -> Result<Value, Error> {
        let outcome = retry(
            self.retry_policy,
            |wait: &Wait<Error>| matches!(wait, Wait::Missing),
            || async {
                match self.run_repo.list_node_runs(run_id).await {
                    Ok(rows) => rows
                        .into_iter()
                        .find(|(id, _)| *id == node_run_id)
                        .map_or(Err(Wait::Missing), |(_, row)| Ok(row)),
                    Err(error) => Err(Wait::Real(error)),
                }
            },
        )
        .await;
        match outcome {
            Ok(row) => Ok(row),
            Err(Ok(Wait::Real(error))) => Err(error),
            Err(Ok(Wait::Missing)) | Err(Err(RetriesExhausted { .. })) => {
                let attempts = self.retry_policy.max_attempts();
                warn!(%run_id, %node_run_id, attempts, "dropping node update with no durable parent create");
                Err(Error::LogWriteMissingParent {
                    entity: "node_run",
                    id: node_run_id.to_string(),
                    attempts,
                })
            }
        }
    }

    /// Dequeue and apply a single task from `queue`, acking on success
    /// and nacking (for broker redelivery) on any error other than the
    /// bounded `LogWriteMissingParent` drop, which acks instead — the
    /// task has been deliberately given up on, not failed transiently.
    ///
    /// Returns `true` if a task was processed, `false` on an empty
    /// `dequeue` timeout.
    pub async fn run_once(&self, queue: &dyn TaskQueue, dequeue_timeout: Duration) -> Result<bool, Error> {
        let Some((task_id, payload)) = queue.dequeue(dequeue_timeout).await? else {
            return Ok(false);
        };
        let task: LogTask = match serde_json::from_value(payload.into_json()) {
            Ok(task) => task,
            Err(error) => {
                warn!(%task_id, %error, "dropping malformed log task");
                queue.ack(&task_id).await?;
                return Ok(true);
            }
        };
        match self.apply(task).await {
            Ok(()) => {
                queue.ack(&task_id).await?;
            }
            Err(Error::LogWriteMissingParent { .. }) => {
                queue.ack(&task_id).await?;
            }
            Err(error) => {
                warn!(%task_id, %error, "log task failed, requeuing");
                queue.nack(&task_id).await?;
            }
        }
        Ok(true)
    }

    /// Run the dequeue/apply loop until `cancellation` fires.
    pub async fn run_forever(&self, queue: &dyn TaskQueue, cancellation: CancellationToken) {
        info!("log writer worker starting");
        loop {
            if cancellation.is_cancelled() {
                break;
            }
            tokio::select! {
                () = cancellation.cancelled() => break,
                result = self.run_once(queue, Duration::from_secs(1)) => {
                    if let Err(error) = result {
                        warn!(%error, "log writer dequeue failed");
                    }
                }
            }
        }
        info!("log writer worker stopped");
    }
}
