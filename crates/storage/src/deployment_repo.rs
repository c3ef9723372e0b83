//! In-memory [`DeploymentRepo`] driver: deployment snapshots keyed by id,
//! plus a slug index maintained alongside it so slug-based lookup (spec
//! §6) never has to scan.

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_core::{DeploymentId, WorkflowId};
use moduly_ports::error::Result;
use moduly_ports::DeploymentRepo;
use moduly_value::Value;

/// In-memory store of deployment snapshots.
#[derive(Default)]
pub struct MemoryDeploymentRepo {
    deployments: DashMap<DeploymentId, Value>,
    // slug -> id of the deployment currently active under it.
    active_by_slug: DashMap<String, DeploymentId>,
}

impl MemoryDeploymentRepo {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slug_of(deployment: &Value) -> Option<String> {
        deployment
            .get_path(&["url_slug"])
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn is_active(deployment: &Value) -> bool {
        deployment
            .get_path(&["active"])
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn workflow_id_of(deployment: &Value) -> Option<WorkflowId> {
        deployment
            .get_path(&["workflow_id"])
            .and_then(|v| v.as_str())
            .and_then(|s| WorkflowId::parse(s).ok())
    }
}

#[async_trait]
impl DeploymentRepo for MemoryDeploymentRepo {
    async fn save(&self, id: DeploymentId, deployment: Value) -> Result<()> {
        let slug = Self::slug_of(&deployment);
        let active = Self::is_active(&deployment);
        let workflow_id = Self::workflow_id_of(&deployment);

        if active {
            // At most one active deployment per workflow (spec §3):
            // deactivate every other snapshot of the same workflow.
            if let Some(workflow_id) = workflow_id {
                let conflicting: Vec<DeploymentId> = self
                    .deployments
                    .iter()
                    .filter(|e| *e.key() != id && Self::workflow_id_of(e.value()) == Some(workflow_id))
                    .map(|e| *e.key())
                    .collect();
                for other_id in conflicting {
                    if let Some(mut other) = self.deployments.get_mut(&other_id) {
                        if let serde_json::Value::Object(map) = &mut other.0 {
                            map.insert("active".into(), serde_json::Value::Bool(false));
                        }
                    }
                }
            }
            if let Some(slug) = &slug {
                self.active_by_slug.insert(slug.clone(), id);
            }
        } else if let Some(slug) = &slug {
            // Clear the slug index if this id was the one active there.
            if self.active_by_slug.get(slug).map(|e| *e) == Some(id) {
                self.active_by_slug.remove(slug);
            }
        }

        self.deployments.insert(id, deployment);
        Ok(())
    }

    async fn get(&self, id: DeploymentId) -> Result<Option<Value>> {
        Ok(self.deployments.get(&id).map(|e| e.clone()))
    }

    async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Value>> {
        let Some(id) = self.active_by_slug.get(slug).map(|e| *e) else {
            return Ok(None);
        };
        Ok(self.deployments.get(&id).map(|e| e.clone()))
    }

    async fn delete(&self, id: DeploymentId) -> Result<bool> {
        let Some((_, deployment)) = self.deployments.remove(&id) else {
            return Ok(false);
        };
        if let Some(slug) = Self::slug_of(&deployment) {
            if self.active_by_slug.get(&slug).map(|e| *e) == Some(id) {
                self.active_by_slug.remove(&slug);
            }
        }
        Ok(true)
    }

    async fn list_for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<(DeploymentId, Value)>> {
        let mut items: Vec<_> = self
            .deployments
            .iter()
            .filter(|e| Self::workflow_id_of(e.value()) == Some(workflow_id))
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        items.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(workflow_id: WorkflowId, slug: &str, active: bool) -> Value {
        Value::new(serde_json::json!({
            "workflow_id": workflow_id.to_string(),
            "url_slug": slug,
            "active": active,
        }))
    }

    #[tokio::test]
    async fn save_then_get_by_slug_round_trips() {
        let repo = MemoryDeploymentRepo::new();
        let workflow_id = WorkflowId::v4();
        let id = DeploymentId::v4();
        repo.save(id, deployment(workflow_id, "my-app", true)).await.unwrap();
        let found = repo.get_active_by_slug("my-app").await.unwrap().unwrap();
        assert_eq!(found.get_path(&["url_slug"]).and_then(|v| v.as_str()), Some("my-app"));
    }

    #[tokio::test]
    async fn publishing_a_new_active_deployment_deactivates_the_previous_one() {
        let repo = MemoryDeploymentRepo::new();
        let workflow_id = WorkflowId::v4();
        let first = DeploymentId::v4();
        let second = DeploymentId::v4();

        repo.save(first, deployment(workflow_id, "my-app", true)).await.unwrap();
        repo.save(second, deployment(workflow_id, "my-app", true)).await.unwrap();

        let first_row = repo.get(first).await.unwrap().unwrap();
        assert_eq!(first_row.get_path(&["active"]).and_then(|v| v.as_bool()), Some(false));

        let active = repo.get_active_by_slug("my-app").await.unwrap().unwrap();
        assert_eq!(active.get_path(&["workflow_id"]), first_row.get_path(&["workflow_id"]));
    }

    #[tokio::test]
    async fn inactive_deployment_is_not_found_by_slug() {
        let repo = MemoryDeploymentRepo::new();
        let id = DeploymentId::v4();
        repo.save(id, deployment(WorkflowId::v4(), "draft", false)).await.unwrap();
        assert_eq!(repo.get_active_by_slug("draft").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_clears_slug_index() {
        let repo = MemoryDeploymentRepo::new();
        let id = DeploymentId::v4();
        repo.save(id, deployment(WorkflowId::v4(), "my-app", true)).await.unwrap();
        assert!(repo.delete(id).await.unwrap());
        assert_eq!(repo.get_active_by_slug("my-app").await.unwrap(), None);
        assert!(!repo.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn list_for_workflow_filters_and_sorts_newest_first() {
        let repo = MemoryDeploymentRepo::new();
        let workflow_id = WorkflowId::v4();
        let other_workflow = WorkflowId::v4();
        let mut ids = vec![DeploymentId::v4(), DeploymentId::v4()];
        ids.sort();
        repo.save(ids[0], deployment(workflow_id, "a", false)).await.unwrap();
        repo.save(ids[1], deployment(workflow_id, "b", false)).await.unwrap();
        repo.save(DeploymentId::v4(), deployment(other_workflow, "c", false)).await.unwrap();

        let list = repo.list_for_workflow(workflow_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0, ids[1]);
        assert_eq!(list[1].0, ids[0]);
    }
}
