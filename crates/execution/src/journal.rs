//! The engine's emitted-event journal (spec §4.1 "Emitted events").
//!
//! A [`JournalEntry`] is the payload carried by both the per-run
//! pub/sub channel (`moduly-eventbus`) and the `log` task queue: the
//! engine builds one value and the gateway/log-writer each interpret it
//! for their own purpose, rather than maintaining two parallel shapes.

use chrono::{DateTime, Utc};
use moduly_core::RunId;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One event in a run's execution timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEntry {
    /// The run began executing.
    WorkflowStart {
        /// The run this event belongs to.
        run_id: RunId,
    },
    /// A node started executing.
    NodeStart {
        /// Graph-local node id.
        node_id: String,
        /// The node's type tag.
        node_type: String,
    },
    /// A node finished executing successfully.
    NodeFinish {
        /// Graph-local node id.
        node_id: String,
        /// The node's type tag.
        node_type: String,
        /// The node's output value.
        output: Json,
    },
    /// The run finished successfully.
    WorkflowFinish {
        /// The run's final output value.
        output: Json,
    },
    /// The run failed.
    Error {
        /// The node that caused the failure, if any (a `WorkflowTimeout`
        /// has none).
        node_id: Option<String>,
        /// Human-readable error message.
        message: String,
    },
}

impl JournalEntry {
    /// Returns `true` for the two terminal event types a subscriber
    /// should stop reading after (spec §4.2).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkflowFinish { .. } | Self::Error { .. })
    }
}

/// A timestamped [`JournalEntry`] as it crosses the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    /// When the engine produced this event.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub entry: JournalEntry,
}

impl JournalRecord {
    /// Stamp an entry with the current time.
    #[must_use]
    pub fn now(entry: JournalEntry) -> Self {
        Self {
            timestamp: Utc::now(),
            entry,
        }
    }
}
