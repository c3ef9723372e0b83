//! Workflow repository port.
//!
//! Defines the persistence interface for graph definitions. Backend
//! drivers (the in-memory store, or a future relational one) implement
//! this trait. Graphs are handed across this boundary as JSON rather
//! than as `moduly-workflow`'s typed `Graph`, so this crate never needs
//! to depend on the graph-validation crate.

use async_trait::async_trait;
use moduly_core::WorkflowId;
use moduly_value::Value;

use crate::error::Result;

/// Persistence interface for graph definitions.
///
/// All methods are async and object-safe. Implementations must be
/// `Send + Sync` so the trait object can be shared across Tokio tasks.
#[async_trait]
pub trait WorkflowRepo: Send + Sync {
    /// Get a graph definition by id.
    async fn get(&self, id: WorkflowId) -> Result<Option<Value>>;

    /// Save a graph definition with optimistic concurrency.
    ///
    /// `expected_version` is the version the caller last observed. A
    /// mismatch against the stored version surfaces as
    /// `moduly_error::Error::Validation`, since a genuine conflict
    /// indicates a concurrent editor the gateway is responsible for
    /// reporting, not something this port needs a dedicated variant
    /// for.
    async fn save(&self, id: WorkflowId, expected_version: u64, definition: Value) -> Result<()>;

    /// Delete a graph by id. Returns `true` if it existed.
    async fn delete(&self, id: WorkflowId) -> Result<bool>;

    /// List graph definitions with pagination, oldest id first.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<(WorkflowId, Value)>>;
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn WorkflowRepo) {}
