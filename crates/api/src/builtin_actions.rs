//! A minimal built-in [`ActionRegistry`] for the workflow worker binary.
//!
//! A full node-type catalog (`httpRequest`, `llmNode`, `transform`, ...)
//! is configuration outside this crate's scope — the engine only ever
//! sees nodes through the [`Action`] contract, and concrete node types
//! are registered by whatever deployment wires them in. This module
//! registers just enough to make the trigger node types and a generic
//! pass-through available, so `moduly-workflow-worker` can execute a
//! graph end to end without a node-type library existing yet, mirroring
//! the `Echo`/`Start` fixtures `moduly-engine`'s own scenario tests
//! register against a bare [`ActionRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use moduly_action::{Action, ActionContext, ActionMetadata, ActionOutput};
use moduly_engine::ActionRegistry;
use moduly_error::Error;
use moduly_workflow::TRIGGER_NODE_TYPES;

struct PassThrough(ActionMetadata);

#[async_trait]
impl Action for PassThrough {
    fn metadata(&self) -> &ActionMetadata {
        &self.0
    }

    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::new(ctx.inputs.clone()))
    }
}

/// Build a registry with a pass-through action registered for every
/// trigger node type and for `answerNode`, the only node types a graph
/// is guaranteed to contain.
#[must_use]
pub fn minimal_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    for node_type in TRIGGER_NODE_TYPES {
        registry.register(Arc::new(PassThrough(ActionMetadata::new(
            node_type,
            "passes its trigger payload through unchanged",
        ))));
    }
    registry.register(Arc::new(PassThrough(ActionMetadata::new(
        "answerNode",
        "passes its resolved input through as the run's final output",
    ))));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_trigger_type() {
        let registry = minimal_registry();
        for node_type in TRIGGER_NODE_TYPES {
            assert!(registry.get(node_type).is_some());
        }
        assert!(registry.get("answerNode").is_some());
    }
}
