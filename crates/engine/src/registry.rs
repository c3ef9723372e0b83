//! Dispatch table from node type tag to its [`Action`] implementation
//! (spec §4.1: the engine sees nodes only through the uniform `Action`
//! contract, never their concrete type).

use std::collections::HashMap;
use std::sync::Arc;

use moduly_action::Action;

/// Maps a node's type tag to the [`Action`] that executes it.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under its metadata's node type.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let node_type = action.metadata().node_type.clone();
        self.actions.insert(node_type, action);
    }

    /// Look up the action for a node type tag.
    #[must_use]
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(node_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use moduly_action::{ActionContext, ActionMetadata, ActionOutput};
    use moduly_error::Error;

    struct Noop(ActionMetadata);

    #[async_trait]
    impl Action for Noop {
        fn metadata(&self) -> &ActionMetadata {
            &self.0
        }
        async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error> {
            Ok(ActionOutput::new(ctx.inputs.clone()))
        }
    }

    #[test]
    fn register_and_lookup_by_type() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(Noop(ActionMetadata::new("echo", "echoes input"))));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }
}
