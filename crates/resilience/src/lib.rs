#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Resilience
//!
//! Bounded exponential backoff for idempotent task handlers (spec §7
//! "all task handlers are idempotent so broker retries never
//! double-write", and the log writer's bounded retry-then-drop policy
//! for `LogWriteMissingParent`).

pub mod retry;

pub use retry::{retry, RetriesExhausted, RetryPolicy};
