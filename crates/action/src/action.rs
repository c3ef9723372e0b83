use async_trait::async_trait;
use moduly_error::Error;

use crate::context::ActionContext;
use crate::metadata::ActionMetadata;
use crate::result::ActionOutput;

/// The uniform contract every node type implements.
///
/// The engine never knows what a node *does* — only that it can be
/// asked to `run` against a context and will produce an output or an
/// error. Object-safe so the engine can hold a registry of
/// `Arc<dyn Action>` keyed by node type rather than matching on an enum.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Static metadata describing this node type: its name, description,
    /// configuration schema, and the branch handles it may select.
    fn metadata(&self) -> &ActionMetadata;

    /// Execute one node attempt.
    ///
    /// Implementations should check `ctx.is_cancelled()` at any
    /// checkpoint before doing further work once cancellation is
    /// observable, so fail-fast cancellation doesn't wait on a node that
    /// could have stopped early.
    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutput, Error>;
}
