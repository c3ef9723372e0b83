//! In-memory [`RunRepo`] driver: idempotent upserts of run/node-run rows
//! keyed by their primary key (spec §4.2, §9b).

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_core::{NodeRunId, RunId};
use moduly_ports::error::Result;
use moduly_ports::RunRepo;
use moduly_value::Value;

/// In-memory store of run and node-run rows.
#[derive(Default)]
pub struct MemoryRunRepo {
    runs: DashMap<RunId, Value>,
    node_runs: DashMap<NodeRunId, (RunId, Value)>,
    // Preserves creation order within a run, since DashMap has none.
    node_run_order: DashMap<RunId, Vec<NodeRunId>>,
}

impl MemoryRunRepo {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn merge(existing: Option<Value>, incoming: Value) -> Value {
        let (Some(existing), incoming) = (existing, incoming) else {
            return incoming;
        };
        let (serde_json::Value::Object(mut base), serde_json::Value::Object(patch)) =
            (existing.into_json(), incoming.into_json())
        else {
            return Value::null();
        };
        base.extend(patch);
        Value::new(serde_json::Value::Object(base))
    }
}

#[async_trait]
impl RunRepo for MemoryRunRepo {
    async fn upsert_run(&self, id: RunId, fields: Value) -> Result<()> {
        let existing = self.runs.get(&id).map(|e| e.clone());
        self.runs.insert(id, Self::merge(existing, fields));
        Ok(())
    }

    async fn get_run(&self, id: RunId) -> Result<Option<Value>> {
        Ok(self.runs.get(&id).map(|e| e.clone()))
    }

    async fn upsert_node_run(&self, id: NodeRunId, run_id: RunId, fields: Value) -> Result<()> {
        let existing = self.node_runs.get(&id).map(|e| e.1.clone());
        let is_new = existing.is_none();
        self.node_runs
            .insert(id, (run_id, Self::merge(existing, fields)));
        if is_new {
            self.node_run_order.entry(run_id).or_default().push(id);
        }
        Ok(())
    }

    async fn list_node_runs(&self, run_id: RunId) -> Result<Vec<(NodeRunId, Value)>> {
        let Some(order) = self.node_run_order.get(&run_id) else {
            return Ok(Vec::new());
        };
        Ok(order
            .iter()
            .filter_map(|id| self.node_runs.get(id).map(|e| (*id, e.1.clone())))
            .collect())
    }
}
