//! Strongly-typed UUID identifiers for Moduly entities.
//!
//! Each identifier wraps a `uuid::Uuid` with a distinct marker type so
//! the compiler rejects mixing, say, a `RunId` where a `NodeId` is
//! expected. All types are `Copy` (16 bytes), `Eq`, `Ord`, `Hash`, and
//! round-trip through serde as plain UUID strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declare a strongly-typed UUID newtype with the standard Moduly surface.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random (v4) identifier.
            #[must_use]
            pub fn v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// The nil (all-zero) identifier, useful as a default/sentinel.
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Returns `true` if this is the nil identifier.
            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Parse an identifier from its string form.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Wrap a raw `Uuid`.
            #[must_use]
            pub const fn new(raw: Uuid) -> Self {
                Self(raw)
            }

            /// Unwrap to the raw `Uuid`.
            #[must_use]
            pub const fn get(self) -> Uuid {
                self.0
            }

            /// The type name of this identifier's domain, e.g. `"RunId"`.
            #[must_use]
            pub const fn domain(&self) -> &'static str {
                stringify!($name)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = uuid::Error;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = uuid::Error;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<Uuid> for $name {
            fn from(raw: Uuid) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifies one invocation of a graph (a `Run`).
    RunId
);
define_id!(
    /// Identifies a `NodeRun` row (one node's execution within a `Run`).
    ///
    /// Generated by the engine before `node_start` is emitted, so that
    /// the subsequent `node_finish`/`error` event upserts the same row
    /// (see `moduly-workflow`'s `NodeKey` for the user-authored,
    /// graph-local string identifier this is distinct from).
    NodeRunId
);
define_id!(
    /// Identifies a workflow definition.
    WorkflowId
);
define_id!(
    /// Identifies a published, frozen snapshot of a workflow graph.
    DeploymentId
);
define_id!(
    /// Identifies a user account.
    UserId
);
define_id!(
    /// Identifies a tenant for sandbox fairness and multi-tenancy scoping.
    TenantId
);
define_id!(
    /// Identifies a stored provider credential.
    CredentialId
);
define_id!(
    /// Identifies an LLM/embedding/rerank model entry.
    ModelId
);
define_id!(
    /// Identifies a knowledge base (RAG index scope).
    KnowledgeBaseId
);
define_id!(
    /// Identifies a source document within a knowledge base.
    DocumentId
);
define_id!(
    /// Identifies one chunk of a document.
    ChunkId
);
define_id!(
    /// Identifies a scheduled trigger binding.
    ScheduleId
);
define_id!(
    /// Identifies a durable task on the broker.
    TaskId
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn v4_creates_non_nil() {
        assert!(!RunId::v4().is_nil());
    }

    #[test]
    fn nil_is_nil() {
        assert!(NodeRunId::nil().is_nil());
        assert_eq!(
            NodeRunId::nil().to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn parse_roundtrips() {
        let id = WorkflowId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn parse_invalid_errors() {
        assert!(WorkflowId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn copy_semantics() {
        let a = RunId::v4();
        let b = a;
        assert_eq!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let id = RunId::v4();
        let json = serde_json::to_string(&id).unwrap();
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn distinct_domains_are_distinct_types() {
        fn accepts_run(_: RunId) {}
        fn accepts_node_run(_: NodeRunId) {}
        accepts_run(RunId::v4());
        accepts_node_run(NodeRunId::v4());
    }

    #[test]
    fn ordering_is_consistent() {
        let a = NodeRunId::nil();
        let b = NodeRunId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert!(a < b);
    }

    #[test]
    fn domain_name() {
        assert_eq!(RunId::nil().domain(), "RunId");
    }
}
