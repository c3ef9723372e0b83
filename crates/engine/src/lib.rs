#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Engine
//!
//! The graph execution engine (spec §4.1): a readiness-driven scheduler
//! under a bounded concurrency gate, branching via the precomputed
//! handle index, per-node and per-workflow timeouts, fail-fast
//! cancellation on any node failure, and sub-workflow/loop execution.
//!
//! The engine depends only on the ports in `moduly-ports` plus the node
//! contract in `moduly-action` — it is wired to concrete storage, event
//! bus, and task queue drivers by the binary that constructs it
//! (`moduly-api`'s workflow-engine worker).

pub mod config;
pub mod engine;
pub mod input_view;
pub mod registry;

pub use config::EngineConfig;
pub use engine::{Engine, RunMeta};
pub use registry::ActionRegistry;
