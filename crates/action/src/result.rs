//! The outcome of one action invocation (spec §4.1: "a node either
//! produces an output, errors, or — for branching node types — selects
//! one outgoing handle").

use moduly_value::Value;

/// What an [`Action`](crate::Action) produced on success.
///
/// This is deliberately flat: a single output value plus an optional
/// branch selection, rather than a larger flow-control enum. The only
/// control-flow signal a node type needs to give the engine is which
/// outgoing handle to follow (spec §4.1.2's conditional edges); looping
/// and sub-workflow dispatch are graph-level concerns the engine decides
/// from node *type*, not from a per-result variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    /// The value downstream nodes see at this node's id in the results
    /// map.
    pub output: Value,
    /// For conditional node types, the outgoing handle to follow. `None`
    /// means "follow every outgoing edge", the default for non-branching
    /// node types.
    pub selected_handle: Option<String>,
}

impl ActionOutput {
    /// An output with no branch selection.
    #[must_use]
    pub fn new(output: Value) -> Self {
        Self {
            output,
            selected_handle: None,
        }
    }

    /// An output that selects a single outgoing handle.
    #[must_use]
    pub fn branch(output: Value, handle: impl Into<String>) -> Self {
        Self {
            output,
            selected_handle: Some(handle.into()),
        }
    }
}
