#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Execution
//!
//! `Run`/`NodeRun` record types, their status transitions, idempotency
//! keys for the log queue's at-least-once handlers, and the journal
//! entry shape shared by the event bus and the log writer (spec §3,
//! §4.1 "Emitted events", §4.2, §9 open question (b) "PK-stable upsert").

pub mod idempotency;
pub mod journal;
pub mod node_run;
pub mod run;
pub mod transition;
pub mod usage;

pub use idempotency::{IdempotencyKey, IdempotencyManager};
pub use journal::{JournalEntry, JournalRecord};
pub use node_run::NodeRun;
pub use run::Run;
pub use usage::Usage;
