//! End-to-end scheduling scenarios (spec §8): fan-out/fan-in,
//! conditional branching, loop aggregation, and timeout propagation.
//! Each test wires a real [`Engine`] against the in-memory
//! `moduly-storage`/`moduly-eventbus` drivers and a handful of
//! [`Action`] stubs, rather than mocking the scheduler itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moduly_action::{Action, ActionContext, ActionMetadata, ActionOutput};
use moduly_core::{RunId, WorkflowId};
use moduly_engine::{ActionRegistry, Engine, EngineConfig, RunMeta};
use moduly_error::Error;
use moduly_eventbus::BroadcastEventBus;
use moduly_ports::EventBus;
use moduly_storage::MemoryQueue;
use moduly_value::Value;
use moduly_workflow::{Edge, Graph, Node};

struct Echo;

#[async_trait]
impl Action for Echo {
    fn metadata(&self) -> &ActionMetadata {
        static META: std::sync::OnceLock<ActionMetadata> = std::sync::OnceLock::new();
        META.get_or_init(|| ActionMetadata::new("echo", "returns its inputs unchanged"))
    }

    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::new(ctx.inputs.clone()))
    }
}

/// The trigger node's own action: returns the raw user payload it
/// received unchanged, so downstream nodes see `{"start": <payload>}`
/// in their results-map snapshot (spec §4.1.4).
struct Start;

#[async_trait]
impl Action for Start {
    fn metadata(&self) -> &ActionMetadata {
        static META: std::sync::OnceLock<ActionMetadata> = std::sync::OnceLock::new();
        META.get_or_init(|| ActionMetadata::new("startNode", "the graph's trigger node"))
    }

    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::new(ctx.inputs.clone()))
    }
}

struct Join;

#[async_trait]
impl Action for Join {
    fn metadata(&self) -> &ActionMetadata {
        static META: std::sync::OnceLock<ActionMetadata> = std::sync::OnceLock::new();
        META.get_or_init(|| ActionMetadata::new("join", "fans in every ancestor's output"))
    }

    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::new(ctx.inputs.clone()))
    }
}

struct IfNode;

#[async_trait]
impl Action for IfNode {
    fn metadata(&self) -> &ActionMetadata {
        static META: std::sync::OnceLock<ActionMetadata> = std::sync::OnceLock::new();
        META.get_or_init(|| {
            ActionMetadata::new("ifNode", "selects true or false").with_branches(["true", "false"])
        })
    }

    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
        let cond = ctx
            .inputs
            .get_path(&["start", "cond"])
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let handle = if cond { "true" } else { "false" };
        Ok(ActionOutput::branch(ctx.inputs.clone(), handle))
    }
}

struct Double;

#[async_trait]
impl Action for Double {
    fn metadata(&self) -> &ActionMetadata {
        static META: std::sync::OnceLock<ActionMetadata> = std::sync::OnceLock::new();
        META.get_or_init(|| ActionMetadata::new("codeNode", "doubles the item's v field"))
    }

    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
        let v = ctx.inputs.get_path(&["item", "v"]).and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(ActionOutput::new(Value::new(serde_json::json!(v * 2))))
    }
}

struct SleepForever;

#[async_trait]
impl Action for SleepForever {
    fn metadata(&self) -> &ActionMetadata {
        static META: std::sync::OnceLock<ActionMetadata> = std::sync::OnceLock::new();
        META.get_or_init(|| ActionMetadata::new("slowNode", "sleeps past its deadline"))
    }

    async fn run(&self, _ctx: &ActionContext) -> Result<ActionOutput, Error> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ActionOutput::new(Value::null()))
    }
}

fn build_engine(registry: ActionRegistry, config: EngineConfig) -> (Engine, Arc<BroadcastEventBus>) {
    let (engine, event_bus, _log_queue) = build_engine_with_log_queue(registry, config);
    (engine, event_bus)
}

fn build_engine_with_log_queue(
    registry: ActionRegistry,
    config: EngineConfig,
) -> (Engine, Arc<BroadcastEventBus>, Arc<MemoryQueue>) {
    let event_bus = Arc::new(BroadcastEventBus::new());
    let log_queue = Arc::new(MemoryQueue::new(1024));
    let engine = Engine::new(Arc::new(registry), event_bus.clone(), log_queue.clone(), None, config);
    (engine, event_bus, log_queue)
}

#[tokio::test]
async fn fan_out_fan_in_all_branches_observe_start_output() {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Start));
    registry.register(Arc::new(Echo));
    registry.register(Arc::new(Join));
    let (engine, event_bus) = build_engine(registry, EngineConfig::default());

    let graph = Graph::new(
        vec![
            Node::new("start", "startNode"),
            Node::new("a", "echo"),
            Node::new("b", "echo"),
            Node::new("c", "echo"),
            Node::new("join", "join"),
        ],
        vec![
            Edge::new("e1", "start", "a"),
            Edge::new("e2", "start", "b"),
            Edge::new("e3", "start", "c"),
            Edge::new("e4", "a", "join"),
            Edge::new("e5", "b", "join"),
            Edge::new("e6", "c", "join"),
        ],
    );

    let run_id = RunId::v4();
    let mut sub = event_bus.subscribe(&format!("run:{run_id}")).await.unwrap();
    let output = engine
        .run(run_id, &RunMeta::new(WorkflowId::v4()), &graph, Value::new(serde_json::json!({"x": 1})))
        .await
        .unwrap();

    // join observed a snapshot containing every ancestor's output, keyed
    // by node id — a, b, and c all echoed {"start": {"x": 1}}.
    for node_id in ["a", "b", "c"] {
        assert_eq!(
            output.get_path(&[node_id, "start", "x"]),
            Some(&serde_json::json!(1))
        );
    }

    // node_start for a/b/c all precede any node_finish, and exactly one
    // workflow_finish terminates the stream.
    let mut starts = 0;
    let mut finishes = 0;
    let mut saw_workflow_finish = false;
    loop {
        let Some(event) = sub.recv(Duration::from_secs(2)).await else { break };
        let json = event.as_json();
        match json["entry"]["type"].as_str() {
            Some("node_start") => {
                if finishes == 0 {
                    starts += 1;
                }
            }
            Some("node_finish") => finishes += 1,
            Some("workflow_finish") => {
                saw_workflow_finish = true;
                break;
            }
            _ => {}
        }
    }
    assert!(starts >= 3, "expected a/b/c to all start before any finished");
    assert!(saw_workflow_finish);
}

#[tokio::test]
async fn conditional_branching_only_follows_selected_handle() {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Start));
    registry.register(Arc::new(Echo));
    registry.register(Arc::new(IfNode));
    let (engine, event_bus) = build_engine(registry, EngineConfig::default());

    let graph = Graph::new(
        vec![
            Node::new("start", "startNode"),
            Node::new("cond", "ifNode"),
            Node::new("p", "echo"),
            Node::new("q", "echo"),
        ],
        vec![
            Edge::new("e1", "start", "cond"),
            Edge::new("e2", "cond", "p").with_source_handle("true"),
            Edge::new("e3", "cond", "q").with_source_handle("false"),
        ],
    );

    let run_id = RunId::v4();
    let mut sub = event_bus.subscribe(&format!("run:{run_id}")).await.unwrap();
    engine
        .run(run_id, &RunMeta::new(WorkflowId::v4()), &graph, Value::new(serde_json::json!({"cond": true})))
        .await
        .unwrap();

    let mut seen_nodes = Vec::new();
    while let Some(event) = sub.recv(Duration::from_millis(200)).await {
        if let Some("node_start") = event.as_json()["entry"]["type"].as_str() {
            seen_nodes.push(event.as_json()["entry"]["node_id"].as_str().unwrap().to_string());
        }
    }
    assert!(seen_nodes.contains(&"p".to_string()));
    assert!(!seen_nodes.contains(&"q".to_string()));
}

#[tokio::test]
async fn loop_aggregates_iteration_outputs_in_order() {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Start));
    registry.register(Arc::new(Echo));
    registry.register(Arc::new(Double));
    let (engine, _bus) = build_engine(registry, EngineConfig::default());

    let graph = Graph::new(
        vec![
            Node::new("start", "startNode"),
            Node::new("loop1", "loopNode").with_data(Value::new(serde_json::json!({
                "items_path": ["start", "items"],
            }))),
            Node::new("double", "codeNode").with_parent("loop1"),
        ],
        vec![Edge::new("e1", "start", "loop1")],
    );

    let run_id = RunId::v4();
    let inputs = Value::new(serde_json::json!({"items": [{"v": 1}, {"v": 2}, {"v": 3}]}));
    let output = engine.run(run_id, &RunMeta::new(WorkflowId::v4()), &graph, inputs).await.unwrap();

    // final_output falls back to the union of all results since there's
    // no answerNode; the loop node's own entry holds the flattened array.
    assert_eq!(
        output.get_path(&["loop1"]),
        Some(&serde_json::json!([2, 4, 6]))
    );
}

#[tokio::test]
async fn node_timeout_fails_the_run_and_cancels_successors() {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Start));
    registry.register(Arc::new(SleepForever));
    registry.register(Arc::new(Echo));
    let (engine, event_bus) = build_engine(registry, EngineConfig::default());

    let graph = Graph::new(
        vec![
            Node::new("start", "startNode"),
            Node::new("slow", "slowNode").with_timeout(Duration::from_millis(50)),
            Node::new("after", "echo"),
        ],
        vec![Edge::new("e1", "start", "slow"), Edge::new("e2", "slow", "after")],
    );

    let run_id = RunId::v4();
    let mut sub = event_bus.subscribe(&format!("run:{run_id}")).await.unwrap();
    let result = engine.run(run_id, &RunMeta::new(WorkflowId::v4()), &graph, Value::null()).await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("timed out"));

    let mut saw_after_start = false;
    let mut saw_error = false;
    while let Some(event) = sub.recv(Duration::from_millis(200)).await {
        let entry = &event.as_json()["entry"];
        match entry["type"].as_str() {
            Some("node_start") if entry["node_id"] == "after" => saw_after_start = true,
            Some("error") => {
                saw_error = true;
                assert!(entry["message"].as_str().unwrap().contains("timed out"));
            }
            _ => {}
        }
    }
    assert!(!saw_after_start, "downstream node must not start after a timeout");
    assert!(saw_error);
}

#[tokio::test]
async fn successful_run_emits_create_run_and_update_run_finish_tasks() {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Start));
    registry.register(Arc::new(Echo));
    let (engine, _bus, log_queue) = build_engine_with_log_queue(registry, EngineConfig::default());

    let graph = Graph::new(
        vec![Node::new("start", "startNode"), Node::new("a", "echo")],
        vec![Edge::new("e1", "start", "a")],
    );

    let run_id = RunId::v4();
    engine
        .run(run_id, &RunMeta::new(WorkflowId::v4()), &graph, Value::null())
        .await
        .unwrap();

    let mut kinds = Vec::new();
    while let Ok(Some((_, payload))) = log_queue.dequeue(Duration::from_millis(200)).await {
        kinds.push(payload.as_json()["kind"].as_str().unwrap().to_string());
    }
    assert!(kinds.contains(&"create_run".to_string()));
    assert!(kinds.contains(&"update_run_finish".to_string()));
    assert!(kinds.contains(&"create_node".to_string()));
    assert!(kinds.contains(&"update_node_finish".to_string()));
    assert!(!kinds.contains(&"update_run_error".to_string()));
}

#[tokio::test]
async fn failed_run_emits_update_run_error_and_update_node_error_tasks() {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Start));
    registry.register(Arc::new(SleepForever));
    let (engine, _bus, log_queue) = build_engine_with_log_queue(registry, EngineConfig::default());

    let graph = Graph::new(
        vec![
            Node::new("start", "startNode"),
            Node::new("slow", "slowNode").with_timeout(Duration::from_millis(50)),
        ],
        vec![Edge::new("e1", "start", "slow")],
    );

    let run_id = RunId::v4();
    let result = engine
        .run(run_id, &RunMeta::new(WorkflowId::v4()), &graph, Value::null())
        .await;
    assert!(result.is_err());

    let mut kinds = Vec::new();
    while let Ok(Some((_, payload))) = log_queue.dequeue(Duration::from_millis(200)).await {
        kinds.push(payload.as_json()["kind"].as_str().unwrap().to_string());
    }
    assert!(kinds.contains(&"update_run_error".to_string()));
    assert!(kinds.contains(&"update_node_error".to_string()));
    assert!(!kinds.contains(&"update_run_finish".to_string()));
}
