#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Error
//!
//! The error taxonomy of spec §7, as a single [`Error`] enum. Every
//! service-level error converts into this type at its boundary (HTTP
//! handler, task handler) so the gateway can map it to the HTTP status
//! "closest in semantics" and so the engine can make retry decisions
//! without inspecting error messages.

use std::time::Duration;

/// The unified Moduly error type.
///
/// Variants map 1:1 onto spec §7's taxonomy. Each carries enough context
/// to log and to classify as retryable/fatal without string matching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The graph contains a cycle (validation, fatal, never retried).
    #[error("graph contains a cycle reachable from node {node_id}")]
    GraphCycle {
        /// A node on the cycle, for diagnostics.
        node_id: String,
    },

    /// The graph has zero or more than one trigger-typed node.
    #[error("graph must have exactly one trigger node, found {count}")]
    BadTriggerCount {
        /// The number of trigger nodes found.
        count: usize,
    },

    /// A non-parented node is not reachable from the trigger.
    #[error("node {node_id} is not reachable from the trigger")]
    IsolatedNode {
        /// The unreachable node.
        node_id: String,
    },

    /// A single node exceeded its execution deadline.
    #[error("node {node_id} timed out after {elapsed:?}")]
    NodeTimeout {
        /// The node that timed out.
        node_id: String,
        /// How long it ran before being cancelled.
        elapsed: Duration,
    },

    /// The run as a whole exceeded its wall-clock deadline.
    #[error("workflow timed out after {elapsed:?}")]
    WorkflowTimeout {
        /// How long the run had been executing.
        elapsed: Duration,
    },

    /// A node's `_run` returned an unhandled error.
    #[error("node {node_id} failed: {message}")]
    NodeFailure {
        /// The node that failed.
        node_id: String,
        /// The originating error message.
        message: String,
    },

    /// The sandbox rejected a submission because its queue is full.
    #[error("sandbox overloaded: queue depth {depth} exceeds {max}")]
    Overloaded {
        /// Observed queue depth at rejection time.
        depth: usize,
        /// Configured maximum queue depth.
        max: usize,
    },

    /// A sandboxed job raised an error inside its own code.
    #[error("sandbox job raised a runtime error: {0}")]
    SandboxRuntime(String),

    /// A sandboxed job exceeded its wall-clock timeout.
    #[error("sandbox job timed out after {0:?}")]
    SandboxTimeout(Duration),

    /// The isolation harness itself failed (non-JSON stdout, jailer crash, ...).
    #[error("sandbox isolation failure: {0}")]
    SandboxIsolation(String),

    /// A `log.*` update task arrived before its parent create was durable,
    /// and the bounded retry window elapsed without the create appearing.
    #[error("log update for {entity} {id} arrived with no durable parent after {attempts} attempts")]
    LogWriteMissingParent {
        /// Kind of entity (`"run"` or `"node_run"`).
        entity: &'static str,
        /// Identifier of the entity that never got its create.
        id: String,
        /// Number of retry attempts made before giving up.
        attempts: u32,
    },

    /// The configured credential failed authentication with the provider.
    #[error("provider authentication failed: {0}")]
    ProviderAuth(String),

    /// The provider rejected the call due to a rate limit or quota.
    #[error("provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// A transport-level failure talking to the provider (network, 5xx, ...).
    #[error("provider transport error: {0}")]
    ProviderTransport(String),

    /// Graph/config/body failed validation (maps to HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Public access was attempted against a deployment not marked public
    /// (maps to HTTP 403).
    #[error("public access denied: {0}")]
    PublicAccessDenied(String),

    /// The referenced slug/deployment/run does not exist (maps to HTTP 404).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity.
        entity: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// Catch-all for unexpected internal errors (maps to HTTP 500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` for errors a caller may usefully retry.
    ///
    /// Only [`Overloaded`](Self::Overloaded) and the provider transport/
    /// quota variants are retryable; validation and structural errors
    /// never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Overloaded { .. } | Self::ProviderQuota(_) | Self::ProviderTransport(_)
        )
    }

    /// Returns `true` for errors that should fail a run fast with no
    /// further nodes scheduled (spec §4.1's fail-fast cancellation).
    #[must_use]
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::GraphCycle { .. }
                | Self::BadTriggerCount { .. }
                | Self::IsolatedNode { .. }
                | Self::NodeTimeout { .. }
                | Self::WorkflowTimeout { .. }
                | Self::NodeFailure { .. }
        )
    }

    /// The HTTP status "closest in semantics" per spec §7.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::GraphCycle { .. }
            | Self::BadTriggerCount { .. }
            | Self::IsolatedNode { .. } => 400,
            Self::PublicAccessDenied(_) => 403,
            Self::NotFound { .. } => 404,
            Self::ProviderQuota(_) => 429,
            Self::Overloaded { .. } => 503,
            Self::WorkflowTimeout { .. } | Self::NodeTimeout { .. } => 504,
            _ => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}
