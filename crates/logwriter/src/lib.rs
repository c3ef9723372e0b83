#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Log Writer
//!
//! The Log Writer worker (spec §4.2 "Log Writer (worker)"): consumes
//! `log.*` tasks from the `log` queue and idempotently persists run and
//! node-run rows through a [`moduly_ports::RunRepo`]. This is the only
//! writer of that state — the engine enqueues tasks, it never writes to
//! storage on the hot path (spec §4.2 "Separation of concerns").
//!
//! Two concerns live here that the port deliberately leaves to the
//! caller: the bounded retry-then-drop policy for an update racing
//! ahead of its parent's create (spec §7 `LogWriteMissingParent`), and
//! keeping only the node-run row whose `finished_at` is latest across
//! arbitrary task duplication or reordering (spec §8 "Node upsert").

pub mod task;
pub mod worker;

pub use task::LogTask;
pub use worker::LogWriter;
