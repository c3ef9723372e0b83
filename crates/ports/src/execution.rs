//! Run repository port.
//!
//! Defines the persistence interface the Log Writer uses to upsert
//! [`moduly_core::RunId`]/[`moduly_core::NodeRunId`] rows (spec §3, §4.2).
//! The engine never depends on this trait directly — it only emits
//! `log.*` tasks — so it is consumed solely by `moduly-logwriter`.
//!
//! Rows cross this boundary as JSON: this crate sits below
//! `moduly-execution` in the workspace (nothing depends on something
//! that depends on it), so the port can't name `moduly-execution`'s
//! typed `Run`/`NodeRun`. The log writer converts to/from JSON at the
//! call site, same as the teacher's `ExecutionRepo` treats state.

use async_trait::async_trait;
use moduly_core::{NodeRunId, RunId};
use moduly_value::Value;

use crate::error::Result;

/// Persistence interface for run and node-run records.
///
/// Both upsert methods are idempotent by primary key (spec §4.2,
/// §9b): re-applying the same `id` with a later snapshot merges into
/// the existing row rather than erroring or duplicating it.
#[async_trait]
pub trait RunRepo: Send + Sync {
    /// Idempotently upsert a run row, keyed by `id`.
    async fn upsert_run(&self, id: RunId, fields: Value) -> Result<()>;

    /// Fetch a run row by id.
    async fn get_run(&self, id: RunId) -> Result<Option<Value>>;

    /// Idempotently upsert a node-run row, keyed by the engine-supplied
    /// `id`. Returns [`crate::error::Error::LogWriteMissingParent`]-classified
    /// errors to the caller unchanged; retry-then-drop policy for
    /// updates racing ahead of their create lives in `moduly-logwriter`,
    /// not in the port implementation.
    async fn upsert_node_run(&self, id: NodeRunId, run_id: RunId, fields: Value) -> Result<()>;

    /// List node-run rows belonging to a run, in creation order.
    async fn list_node_runs(&self, run_id: RunId) -> Result<Vec<(NodeRunId, Value)>>;
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn RunRepo) {}
