//! In-memory [`WorkflowRepo`] driver: graph definitions keyed by id,
//! with optimistic-concurrency versioning (spec §4.2).

use async_trait::async_trait;
use dashmap::DashMap;
use moduly_core::WorkflowId;
use moduly_ports::error::{Error, Result};
use moduly_ports::WorkflowRepo;
use moduly_value::Value;

struct Entry {
    version: u64,
    definition: Value,
}

/// In-memory store of graph definitions.
#[derive(Default)]
pub struct MemoryWorkflowRepo {
    graphs: DashMap<WorkflowId, Entry>,
}

impl MemoryWorkflowRepo {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepo for MemoryWorkflowRepo {
    async fn get(&self, id: WorkflowId) -> Result<Option<Value>> {
        Ok(self.graphs.get(&id).map(|e| e.definition.clone()))
    }

    async fn save(&self, id: WorkflowId, expected_version: u64, definition: Value) -> Result<()> {
        match self.graphs.get(&id) {
            Some(entry) if entry.version != expected_version => Err(Error::Validation(format!(
                "workflow {id} version conflict: expected {expected_version}, found {}",
                entry.version
            ))),
            _ => {
                self.graphs.insert(
                    id,
                    Entry {
                        version: expected_version + 1,
                        definition,
                    },
                );
                Ok(())
            }
        }
    }

    async fn delete(&self, id: WorkflowId) -> Result<bool> {
        Ok(self.graphs.remove(&id).is_some())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<(WorkflowId, Value)>> {
        let mut items: Vec<_> = self
            .graphs
            .iter()
            .map(|e| (*e.key(), e.value().definition.clone()))
            .collect();
        items.sort_by_key(|(id, _)| *id);
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }
}
