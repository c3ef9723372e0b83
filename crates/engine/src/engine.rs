//! The graph execution engine (spec §4.1): readiness-driven scheduling
//! under a bounded concurrency gate, branching via the handle index,
//! per-node/per-workflow timeouts, fail-fast cancellation, and
//! sub-workflow/loop execution.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use moduly_action::{Action, ActionContext, ActionOutput};
use moduly_core::{NodeRunId, RunId, RunStatus, TriggerMode, UserId, WorkflowId};
use moduly_error::Error;
use moduly_execution::{JournalEntry, JournalRecord};
use moduly_ports::{EventBus, TaskQueue, WorkflowRepo};
use moduly_value::Value;
use moduly_workflow::{Graph, GraphIndex, Node};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::EngineConfig;
use crate::input_view;
use crate::registry::ActionRegistry;

const LOOP_NODE_TYPE: &str = "loopNode";
const WORKFLOW_NODE_TYPE: &str = "workflowNode";
const ANSWER_NODE_TYPE: &str = "answerNode";

/// The run-level metadata a `workflow.execute` task carries (spec §4.2,
/// §6) that the engine has no other way to learn: which workflow this
/// is a run of, who triggered it, and how. Carried through solely so
/// [`Engine::run`] can stamp `log.create_run`/`log.update_run_*` tasks
/// with the fields the Log Writer's `Run` row needs — the scheduler
/// itself never inspects these values.
#[derive(Debug, Clone)]
pub struct RunMeta {
    /// The workflow (or deployment) definition this run executes.
    pub workflow_id: WorkflowId,
    /// The user who owns this run, if any (absent for schedule-triggered runs).
    pub user_id: Option<UserId>,
    /// How this run was triggered.
    pub trigger_mode: TriggerMode,
}

impl RunMeta {
    /// A manually-triggered run with no owning user on record.
    #[must_use]
    pub fn new(workflow_id: WorkflowId) -> Self {
        Self {
            workflow_id,
            user_id: None,
            trigger_mode: TriggerMode::Manual,
        }
    }

    /// Attach the triggering user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Override the trigger mode.
    #[must_use]
    pub fn with_trigger_mode(mut self, trigger_mode: TriggerMode) -> Self {
        self.trigger_mode = trigger_mode;
        self
    }
}

/// The graph execution engine.
///
/// One instance can run many graphs; nothing here is per-run state —
/// all of that lives in the local variables of [`Engine::run`].
pub struct Engine {
    registry: Arc<ActionRegistry>,
    event_bus: Arc<dyn EventBus>,
    log_queue: Arc<dyn TaskQueue>,
    workflow_repo: Option<Arc<dyn WorkflowRepo>>,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine over a node-type registry, the event bus and log
    /// queue it publishes to, and an optional `WorkflowRepo` used to
    /// resolve `workflowNode`'s referenced deployment graphs.
    #[must_use]
    pub fn new(
        registry: Arc<ActionRegistry>,
        event_bus: Arc<dyn EventBus>,
        log_queue: Arc<dyn TaskQueue>,
        workflow_repo: Option<Arc<dyn WorkflowRepo>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            event_bus,
            log_queue,
            workflow_repo,
            config,
        }
    }

    /// Execute a validated top-level graph to completion.
    ///
    /// # Errors
    ///
    /// Returns the originating [`Error`] on any node failure, node or
    /// workflow timeout, or graph validation failure.
    pub async fn run(
        &self,
        run_id: RunId,
        meta: &RunMeta,
        graph: &Graph,
        trigger_payload: Value,
    ) -> Result<Value, Error> {
        graph.validate(&[])?;
        self.publish(run_id, JournalEntry::WorkflowStart { run_id }).await;
        self.enqueue_log_create_run(run_id, meta, &trigger_payload);
        let index = graph.build_index();
        let trigger = graph
            .trigger_node()
            .ok_or(Error::BadTriggerCount { count: 0 })?;
        let outcome = self
            .execute_graph(run_id, graph, &index, &[trigger.id.clone()], trigger_payload, true)
            .await;
        match &outcome {
            Ok(output) => {
                self.publish(
                    run_id,
                    JournalEntry::WorkflowFinish {
                        output: output.as_json().clone(),
                    },
                )
                .await;
                self.enqueue_log_update_run_finish(run_id, output);
            }
            Err(error) => {
                self.publish(
                    run_id,
                    JournalEntry::Error {
                        node_id: None,
                        message: error.to_string(),
                    },
                )
                .await;
                self.enqueue_log_update_run_error(run_id, error);
            }
        }
        outcome
    }

    /// Execute a sub-graph (a loop body or a referenced sub-workflow)
    /// attributed to `run_id` but without publishing top-level
    /// `workflow_start`/`workflow_finish` events or creating a new run
    /// (spec §4.1 "Sub-workflows and loops").
    async fn execute_graph(
        &self,
        run_id: RunId,
        graph: &Graph,
        index: &GraphIndex,
        entry_points: &[String],
        trigger_payload: Value,
        publish_events: bool,
    ) -> Result<Value, Error> {
        let mut results: HashMap<String, Value> = HashMap::new();
        let mut executed: HashSet<String> = HashSet::new();
        let mut enqueued: HashSet<String> = entry_points.iter().cloned().collect();
        let mut ready: VecDeque<String> = entry_points.iter().cloned().collect();
        let mut in_flight: usize = 0;

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_width));
        let cancellation = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<NodeCompletion>(64);
        let deadline = Instant::now() + self.config.workflow_timeout;
        let mut failure: Option<Error> = None;

        loop {
            // Dispatch every currently-ready node the gate allows.
            while failure.is_none() {
                let Some(node_id) = ready.pop_front() else { break };
                let Some(node) = graph.node(&node_id) else { continue };
                if node.node_type == LOOP_NODE_TYPE || node.node_type == WORKFLOW_NODE_TYPE {
                    let inputs = if node_id == entry_points[0] && executed.is_empty() {
                        trigger_payload.clone()
                    } else {
                        input_view::snapshot(&results)
                    };
                    let node_run_id = NodeRunId::v4();
                    if publish_events {
                        self.publish(
                            run_id,
                            JournalEntry::NodeStart {
                                node_id: node.id.clone(),
                                node_type: node.node_type.clone(),
                            },
                        )
                        .await;
                    }
                    self.enqueue_log_create_node(run_id, node_run_id, &node.id, &node.node_type);
                    let outcome = self.execute_composite(run_id, node, inputs, node_run_id, graph).await;
                    in_flight += 1;
                    let _ = tx
                        .send(NodeCompletion {
                            node_id: node.id.clone(),
                            node_type: node.node_type.clone(),
                            node_run_id,
                            result: outcome,
                        })
                        .await;
                    continue;
                }

                let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                    ready.push_front(node_id);
                    break;
                };
                let Some(action) = self.registry.get(&node.node_type) else {
                    failure = Some(Error::Internal(format!(
                        "no action registered for node type {}",
                        node.node_type
                    )));
                    break;
                };
                let inputs = if node_id == entry_points[0] && executed.is_empty() {
                    trigger_payload.clone()
                } else {
                    input_view::snapshot(&results)
                };
                let node_run_id = NodeRunId::v4();
                if publish_events {
                    self.publish(
                        run_id,
                        JournalEntry::NodeStart {
                            node_id: node.id.clone(),
                            node_type: node.node_type.clone(),
                        },
                    )
                    .await;
                }
                self.enqueue_log_create_node(run_id, node_run_id, &node.id, &node.node_type);
                let timeout = node.effective_timeout();
                let token = cancellation.clone();
                let tx = tx.clone();
                let node_id_owned = node.id.clone();
                let node_type_owned = node.node_type.clone();
                let config = node.data.clone();
                in_flight += 1;
                tokio::spawn(async move {
                    let _permit = permit;
                    let ctx = ActionContext {
                        run_id,
                        node_run_id,
                        node_id: node_id_owned.clone(),
                        node_type: node_type_owned.clone(),
                        inputs,
                        config,
                        timeout,
                        cancellation: token.clone(),
                    };
                    let result = run_with_timeout(action, ctx, timeout, token).await;
                    let _ = tx
                        .send(NodeCompletion {
                            node_id: node_id_owned,
                            node_type: node_type_owned,
                            node_run_id,
                            result,
                        })
                        .await;
                });
            }

            if in_flight == 0 && (ready.is_empty() || failure.is_some()) {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep_until(deadline.into()) => {
                    cancellation.cancel();
                    failure = Some(Error::WorkflowTimeout { elapsed: self.config.workflow_timeout });
                    break;
                }
                maybe = rx.recv() => {
                    let Some(completion) = maybe else { break };
                    in_flight -= 1;
                    match completion.result {
                        Ok(output) => {
                            executed.insert(completion.node_id.clone());
                            results.insert(completion.node_id.clone(), output.output.clone());
                            if publish_events {
                                self.publish(
                                    run_id,
                                    JournalEntry::NodeFinish {
                                        node_id: completion.node_id.clone(),
                                        node_type: completion.node_type.clone(),
                                        output: output.output.as_json().clone(),
                                    },
                                )
                                .await;
                            }
                            self.enqueue_log_node_finish(run_id, completion.node_run_id);

                            if failure.is_none() {
                                let targets = match &output.selected_handle {
                                    Some(handle) => index.successors_for_handle(&completion.node_id, handle),
                                    None => index.successors(&completion.node_id),
                                };
                                for target in targets {
                                    if executed.contains(target) || enqueued.contains(target) {
                                        continue;
                                    }
                                    if is_ready(target, graph, index, &executed) {
                                        enqueued.insert(target.clone());
                                        ready.push_back(target.clone());
                                    }
                                }
                            }
                        }
                        Err(error) => {
                            self.enqueue_log_update_node_error(run_id, completion.node_run_id, &error);
                            if failure.is_none() {
                                warn!(node_id = %completion.node_id, %error, "node failed, cancelling run");
                                cancellation.cancel();
                                failure = Some(error);
                            }
                        }
                    }
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        Ok(final_output(graph, index, &results))
    }

    async fn execute_composite(
        &self,
        run_id: RunId,
        node: &Node,
        inputs: Value,
        _node_run_id: NodeRunId,
        graph: &Graph,
    ) -> Result<ActionOutput, Error> {
        match node.node_type.as_str() {
            LOOP_NODE_TYPE => self.execute_loop(run_id, node, inputs, graph).await,
            WORKFLOW_NODE_TYPE => self.execute_sub_workflow(run_id, node, inputs).await,
            other => Err(Error::Internal(format!("unknown composite node type {other}"))),
        }
    }

    async fn execute_loop(&self, run_id: RunId, node: &Node, inputs: Value, graph: &Graph) -> Result<ActionOutput, Error> {
        let body = self.build_loop_body(node, graph)?;
        let Some(items_path) = node.data.get_path(&["items_path"]) else {
            return Err(Error::Validation(format!("loop node {} missing items_path", node.id)));
        };
        let items_path: Vec<String> = items_path
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let items = inputs.get_path(&items_path).cloned().unwrap_or(serde_json::Value::Array(vec![]));
        let serde_json::Value::Array(items) = items else {
            return Err(Error::Validation(format!("loop node {} items_path did not resolve to an array", node.id)));
        };

        let collect_flattened = node
            .data
            .get_path(&["collect"])
            .and_then(|v| v.as_str())
            .is_none_or(|mode| mode != "per_iteration");

        let mut flattened = Vec::new();
        let mut per_iteration = Vec::new();
        for item in items {
            let (graph, index) = (&body.0, &body.1);
            let mut iteration_inputs = inputs.clone().into_json();
            if let serde_json::Value::Object(map) = &mut iteration_inputs {
                map.insert("item".to_string(), item);
            }
            let output = self
                .execute_graph(
                    run_id,
                    graph,
                    index,
                    &body.2,
                    Value::new(iteration_inputs),
                    false,
                )
                .await?;
            if collect_flattened {
                if let serde_json::Value::Array(items) = output.as_json() {
                    flattened.extend(items.clone());
                } else {
                    flattened.push(output.as_json().clone());
                }
            } else {
                per_iteration.push(output.as_json().clone());
            }
        }

        let output = if collect_flattened {
            serde_json::Value::Array(flattened)
        } else {
            serde_json::Value::Array(per_iteration)
        };
        Ok(ActionOutput::new(Value::new(output)))
    }

    fn build_loop_body(&self, node: &Node, graph: &Graph) -> Result<(Graph, GraphIndex, Vec<String>), Error> {
        let (body_graph, entry_points) = graph.sub_graph(&node.id)?;
        body_graph.validate(&entry_points)?;
        let index = body_graph.build_index();
        Ok((body_graph, index, entry_points))
    }

    async fn execute_sub_workflow(&self, run_id: RunId, node: &Node, inputs: Value) -> Result<ActionOutput, Error> {
        let Some(repo) = &self.workflow_repo else {
            return Err(Error::Internal("no workflow repo configured for workflowNode".into()));
        };
        let Some(deployment_id) = node.data.get_path(&["deployment_id"]).and_then(|v| v.as_str()) else {
            return Err(Error::Validation(format!("workflow node {} missing deployment_id", node.id)));
        };
        let workflow_id = moduly_core::WorkflowId::parse(deployment_id)
            .map_err(|e| Error::Validation(format!("invalid deployment_id: {e}")))?;
        let definition = repo
            .get(workflow_id)
            .await?
            .ok_or_else(|| Error::not_found("Workflow", deployment_id))?;
        let graph: Graph = serde_json::from_value(definition.into_json())
            .map_err(|e| Error::Internal(format!("stored graph failed to deserialize: {e}")))?;
        graph.validate(&[])?;
        let index = graph.build_index();
        let trigger = graph
            .trigger_node()
            .ok_or(Error::BadTriggerCount { count: 0 })?;
        let output = self
            .execute_graph(run_id, &graph, &index, &[trigger.id.clone()], inputs, false)
            .await?;
        Ok(ActionOutput::new(output))
    }

    fn enqueue_log_create_run(&self, run_id: RunId, meta: &RunMeta, trigger_payload: &Value) {
        self.enqueue_log("create_run", serde_json::json!({
            "kind": "create_run",
            "run_id": run_id.to_string(),
            "workflow_id": meta.workflow_id.to_string(),
            "user_id": meta.user_id.map(|id| id.to_string()),
            "trigger_mode": meta.trigger_mode,
            "status": RunStatus::Running,
            "input": trigger_payload.as_json(),
            "started_at": Utc::now(),
        }));
    }

    fn enqueue_log_update_run_finish(&self, run_id: RunId, output: &Value) {
        self.enqueue_log("update_run_finish", serde_json::json!({
            "kind": "update_run_finish",
            "run_id": run_id.to_string(),
            "status": RunStatus::Success,
            "output": output.as_json(),
            "finished_at": Utc::now(),
        }));
    }

    fn enqueue_log_update_run_error(&self, run_id: RunId, error: &Error) {
        self.enqueue_log("update_run_error", serde_json::json!({
            "kind": "update_run_error",
            "run_id": run_id.to_string(),
            "status": RunStatus::Failed,
            "error_message": error.to_string(),
            "finished_at": Utc::now(),
        }));
    }

    fn enqueue_log_create_node(&self, run_id: RunId, node_run_id: NodeRunId, node_id: &str, node_type: &str) {
        self.enqueue_log("create_node", serde_json::json!({
            "kind": "create_node",
            "run_id": run_id.to_string(),
            "node_run_id": node_run_id.to_string(),
            "node_id": node_id,
            "node_type": node_type,
            "status": "running",
            "started_at": Utc::now(),
        }));
    }

    fn enqueue_log_node_finish(&self, run_id: RunId, node_run_id: NodeRunId) {
        self.enqueue_log("update_node_finish", serde_json::json!({
            "kind": "update_node_finish",
            "run_id": run_id.to_string(),
            "node_run_id": node_run_id.to_string(),
            "status": "success",
            "finished_at": Utc::now(),
        }));
    }

    fn enqueue_log_update_node_error(&self, run_id: RunId, node_run_id: NodeRunId, error: &Error) {
        self.enqueue_log("update_node_error", serde_json::json!({
            "kind": "update_node_error",
            "run_id": run_id.to_string(),
            "node_run_id": node_run_id.to_string(),
            "status": "failed",
            "error_message": error.to_string(),
            "finished_at": Utc::now(),
        }));
    }

    /// Fire-and-forget enqueue of a `log.*` task (spec §4.2): the engine
    /// never blocks the scheduling loop on the log queue, so a slow or
    /// failing enqueue only produces a warning, never backpressure.
    fn enqueue_log(&self, kind: &'static str, payload: serde_json::Value) {
        let queue = Arc::clone(&self.log_queue);
        let value = Value::new(payload);
        tokio::spawn(async move {
            if let Err(error) = queue.enqueue(value).await {
                warn!(%error, kind, "failed to enqueue log task");
            }
        });
    }

    async fn publish(&self, run_id: RunId, entry: JournalEntry) {
        let record = JournalRecord::now(entry);
        let topic = format!("run:{run_id}");
        let payload = Value::new(serde_json::to_value(&record).unwrap_or(serde_json::Value::Null));
        if let Err(error) = self.event_bus.publish(&topic, payload).await {
            warn!(%error, "failed to publish event");
        }
    }
}

struct NodeCompletion {
    node_id: String,
    node_type: String,
    node_run_id: NodeRunId,
    result: Result<ActionOutput, Error>,
}

async fn run_with_timeout(
    action: Arc<dyn Action>,
    ctx: ActionContext,
    timeout: Duration,
    cancellation: CancellationToken,
) -> Result<ActionOutput, Error> {
    let node_id = ctx.node_id.clone();
    tokio::select! {
        result = action.run(&ctx) => result,
        () = tokio::time::sleep(timeout) => Err(Error::NodeTimeout { node_id, elapsed: timeout }),
        () = cancellation.cancelled() => Err(Error::NodeFailure { node_id, message: "cancelled by fail-fast".into() }),
    }
}

fn is_ready(node_id: &str, graph: &Graph, index: &GraphIndex, executed: &HashSet<String>) -> bool {
    let Some(node) = graph.node(node_id) else { return false };
    if node.parent_id.is_some() {
        return false;
    }
    index.predecessors(node_id).iter().all(|p| executed.contains(p))
}

fn final_output(graph: &Graph, index: &GraphIndex, results: &HashMap<String, Value>) -> Value {
    if let Some(node_id) = index.nodes_of_type(ANSWER_NODE_TYPE).first() {
        if let Some(output) = results.get(node_id) {
            return output.clone();
        }
    }
    let _ = graph;
    let merged: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|(k, v)| (k.clone(), v.as_json().clone()))
        .collect();
    Value::new(serde_json::Value::Object(merged))
}
