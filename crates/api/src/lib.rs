#![warn(missing_docs)]

//! # Moduly API
//!
//! The Gateway HTTP surface (spec §6 "Run API", §2 "Gateway") plus the
//! wiring shared by the other four service binaries (workflow worker,
//! log writer worker, sandbox service, retrieval service). Everything
//! library-shaped lives here; each `src/bin/*.rs` is a thin `main()`
//! that reads a `*Config::from_env()`, constructs the driver crates it
//! needs, and serves or loops forever.
//!
//! CRUD for apps/workflows/deployments/credentials, session
//! authentication beyond bearer-token validation, and the individual
//! node implementations the engine schedules are external
//! collaborators per spec §1 and have no surface here.

pub mod auth;
pub mod builtin_actions;
pub mod config;
pub mod error;
pub mod retrieval_router;
pub mod retrieval_stubs;
pub mod router;
pub mod routes;
pub mod sandbox_router;
pub mod state;
pub mod workflow_task;

pub use config::{GatewayConfig, RetrievalServiceConfig, SandboxServiceConfig};
pub use error::ApiError;
pub use retrieval_router::retrieval_router;
pub use router::gateway_router;
pub use sandbox_router::sandbox_router;
pub use state::{GatewayState, RetrievalState, SandboxState};
pub use workflow_task::WorkflowExecuteTask;
