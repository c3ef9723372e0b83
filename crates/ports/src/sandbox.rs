//! Sandbox runner port.
//!
//! Defines the interface the engine uses to submit a job to the
//! sandbox scheduler (spec §4.3) and await its result, without
//! depending on the scheduler's concrete MLFQ/process-isolation
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use moduly_value::Value;

use crate::error::Result;

/// Priority bucket a job is submitted at, per spec §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Dispatched before `Normal` and `Low` jobs in the same tenant slot.
    High = 0,
    /// The default priority when none is specified and no history hint applies.
    Normal = 1,
    /// Dispatched only after `High` and `Normal` buckets are exhausted.
    Low = 2,
}

/// A unit of untrusted code submitted for isolated execution.
#[derive(Debug, Clone)]
pub struct Job {
    /// Opaque code payload (source text, bytecode, or similar).
    pub code: String,
    /// Named inputs delivered to the code at execution time.
    pub inputs: Value,
    /// Wall-clock budget before the job is cancelled with a timeout error.
    pub timeout: Duration,
    /// Requested priority, or `None` to let the scheduler's
    /// execution-history advisor suggest one.
    pub priority: Option<Priority>,
    /// Opaque tenant identifier used for fair round-robin dispatch.
    pub tenant_id: String,
    /// Whether the job may open network connections (spec §4.3:
    /// "network allowed only on explicit request"). `false` by default;
    /// the isolation layer denies network access unless this is set.
    pub enable_network: bool,
}

/// The result of one isolated job execution.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// `true` if the sandboxed code completed without raising.
    pub success: bool,
    /// The code's return value, present only when `success` is `true`.
    pub result: Option<Value>,
    /// A human-readable error message, present only when `success` is `false`.
    pub error: Option<String>,
}

/// Port trait for submitting jobs to the sandbox scheduler.
///
/// Implemented by `moduly-sandbox`'s scheduler; consumed by
/// `moduly-engine` for `codeNode` execution and by the retrieval
/// service's ingestion path, which also runs inside the same isolation
/// boundary when it invokes user-configured extraction code.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    /// Submit a job and await its outcome.
    ///
    /// Returns [`crate::error::Error::Overloaded`] if the scheduler's
    /// queue depth exceeds its configured maximum (spec §4.3
    /// backpressure) rather than blocking indefinitely.
    async fn execute(&self, job: Job) -> Result<JobOutcome>;
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn SandboxRunner) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_high_first() {
        assert!(Priority::High < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
    }
}
