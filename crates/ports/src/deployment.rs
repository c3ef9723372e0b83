//! Deployment repository port.
//!
//! Defines the persistence interface for published graph snapshots
//! (spec §3 "Deployment", §6 `GET /deployments/public/{slug}/info`):
//! the gateway resolves an incoming slug to the active deployment
//! before enqueueing a run, so lookup is by slug first and by id
//! second. Deployments cross this boundary as JSON for the same reason
//! [`crate::workflow::WorkflowRepo`] does — this crate sits below
//! `moduly-workflow`, which owns the typed `Deployment` struct.

use async_trait::async_trait;
use moduly_core::DeploymentId;
use moduly_value::Value;

use crate::error::Result;

/// Persistence interface for deployment snapshots.
///
/// Invariant enforced by implementations (spec §3): `save` with
/// `active: true` must atomically deactivate any other deployment
/// already active for the same `workflow_id`, so at most one
/// deployment per workflow is ever routable by slug at a time.
#[async_trait]
pub trait DeploymentRepo: Send + Sync {
    /// Save (insert or replace) a deployment snapshot, keyed by id.
    async fn save(&self, id: DeploymentId, deployment: Value) -> Result<()>;

    /// Fetch a deployment by id.
    async fn get(&self, id: DeploymentId) -> Result<Option<Value>>;

    /// Fetch the currently active deployment published under a slug,
    /// the lookup path `POST /run/{slug}` and `POST /run-public/{slug}`
    /// both need (spec §6). `None` if no deployment is active there.
    async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Value>>;

    /// Delete a deployment by id. Returns `true` if it existed.
    async fn delete(&self, id: DeploymentId) -> Result<bool>;

    /// List every deployment snapshot that has ever been published for
    /// a workflow, newest first.
    async fn list_for_workflow(&self, workflow_id: moduly_core::WorkflowId) -> Result<Vec<(DeploymentId, Value)>>;
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn DeploymentRepo) {}
