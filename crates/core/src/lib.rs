#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Core
//!
//! Strongly-typed identifiers and shared vocabulary (scopes, trigger
//! modes, statuses) used across every Moduly crate. Deliberately tiny
//! and dependency-light: everything downstream depends on this crate,
//! so it must never depend on anything downstream.

pub mod id;
pub mod scope;

pub use id::{
    ChunkId, CredentialId, DeploymentId, DocumentId, KnowledgeBaseId, ModelId, NodeRunId, RunId,
    ScheduleId, TaskId, TenantId, UserId, WorkflowId,
};
pub use scope::{NodeRunStatus, RunStatus, ScopeLevel, TriggerMode};

/// Common prelude for downstream Moduly crates.
pub mod prelude {
    pub use super::{
        ChunkId, CredentialId, DeploymentId, DocumentId, KnowledgeBaseId, ModelId, NodeRunId,
        NodeRunStatus, RunId, RunStatus, ScheduleId, ScopeLevel, TaskId, TenantId, TriggerMode,
        UserId, WorkflowId,
    };
}
