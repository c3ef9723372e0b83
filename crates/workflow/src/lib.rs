#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Workflow
//!
//! Graph definition, DAG validation, and the precomputed indices the
//! execution engine's scheduling loop relies on (spec §3 "Graph", §4.1
//! "Graph validation" and "Precomputed structures").
//!
//! This crate knows nothing about *running* a graph — only about what a
//! valid one looks like and how to look up its structure in O(1). The
//! engine (`moduly-engine`) owns scheduling and execution state.

pub mod deployment;
pub mod edge;
pub mod graph;
pub mod index;
pub mod node;
pub mod validate;

pub use deployment::{Deployment, DeploymentType, ScheduleBinding};
pub use edge::Edge;
pub use graph::Graph;
pub use index::GraphIndex;
pub use node::{Node, DEFAULT_NODE_TIMEOUT, TRIGGER_NODE_TYPES};
