#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Storage
//!
//! In-memory drivers for every storage-shaped port (spec §4.2, §4.4,
//! §5): [`WorkflowRepo`](moduly_ports::WorkflowRepo),
//! [`DeploymentRepo`](moduly_ports::DeploymentRepo),
//! [`RunRepo`](moduly_ports::RunRepo),
//! [`TaskQueue`](moduly_ports::TaskQueue),
//! [`VectorIndex`](moduly_ports::VectorIndex)/
//! [`KeywordIndex`](moduly_ports::KeywordIndex), and
//! [`Lease`](moduly_ports::Lease). Suitable for single-process and test
//! deployments; a durable relational/object-store driver is a future
//! swap behind the same traits.

pub mod deployment_repo;
pub mod keyword_index;
pub mod lease;
pub mod queue;
pub mod run_repo;
pub mod vector_index;
pub mod workflow_repo;

pub use deployment_repo::MemoryDeploymentRepo;
pub use keyword_index::MemoryKeywordIndex;
pub use lease::MemoryLease;
pub use queue::MemoryQueue;
pub use run_repo::MemoryRunRepo;
pub use vector_index::MemoryVectorIndex;
pub use workflow_repo::MemoryWorkflowRepo;
