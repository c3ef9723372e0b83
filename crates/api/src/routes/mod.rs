//! HTTP handlers for the Gateway and Sandbox services (spec §6
//! "External Interfaces").

pub mod retrieval;
pub mod run;
pub mod sandbox;
