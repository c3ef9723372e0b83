//! State-machine transition validation for [`RunStatus`] and
//! [`NodeRunStatus`] (spec §3: "exactly one terminal status").

use moduly_core::{NodeRunStatus, RunStatus};
use moduly_error::Error;

/// Returns `true` if the run-level transition from `from` to `to` is valid.
///
/// Every non-`Running` status is terminal, so the only legal transitions
/// are `Running -> {Success, Failed, Stopped}`; re-entering `Running` or
/// transitioning out of a terminal status is never valid.
#[must_use]
pub fn can_transition_run(from: RunStatus, to: RunStatus) -> bool {
    matches!(
        (from, to),
        (RunStatus::Running, RunStatus::Success)
            | (RunStatus::Running, RunStatus::Failed)
            | (RunStatus::Running, RunStatus::Stopped)
    )
}

/// Validate a run-level transition, returning [`Error::Validation`] if invalid.
pub fn validate_run_transition(from: RunStatus, to: RunStatus) -> Result<(), Error> {
    if can_transition_run(from, to) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid run transition: {from:?} -> {to:?}"
        )))
    }
}

/// Returns `true` if the node-run transition from `from` to `to` is valid.
#[must_use]
pub fn can_transition_node_run(from: NodeRunStatus, to: NodeRunStatus) -> bool {
    matches!(
        (from, to),
        (NodeRunStatus::Running, NodeRunStatus::Success)
            | (NodeRunStatus::Running, NodeRunStatus::Failed)
            | (NodeRunStatus::Running, NodeRunStatus::Skipped)
    )
}

/// Validate a node-run transition, returning [`Error::Validation`] if invalid.
pub fn validate_node_run_transition(from: NodeRunStatus, to: NodeRunStatus) -> Result<(), Error> {
    if can_transition_node_run(from, to) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid node run transition: {from:?} -> {to:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_to_success_is_valid() {
        assert!(can_transition_run(RunStatus::Running, RunStatus::Success));
    }

    #[test]
    fn terminal_to_terminal_is_invalid() {
        assert!(!can_transition_run(RunStatus::Success, RunStatus::Failed));
        assert!(!can_transition_run(RunStatus::Failed, RunStatus::Running));
    }

    #[test]
    fn validate_run_transition_err_message() {
        let err = validate_run_transition(RunStatus::Success, RunStatus::Running).unwrap_err();
        assert!(err.to_string().contains("invalid run transition"));
    }

    #[test]
    fn node_run_transitions() {
        assert!(can_transition_node_run(
            NodeRunStatus::Running,
            NodeRunStatus::Success
        ));
        assert!(can_transition_node_run(
            NodeRunStatus::Running,
            NodeRunStatus::Skipped
        ));
        assert!(!can_transition_node_run(
            NodeRunStatus::Success,
            NodeRunStatus::Running
        ));
    }
}
