//! Deployment snapshots (spec §3 "Deployment"): a frozen graph bound to a
//! public slug, versioned with `semver` so multiple published revisions
//! of one app can coexist while only the active one is routable.

use chrono::{DateTime, Utc};
use moduly_core::{DeploymentId, WorkflowId};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// The surface a deployment is reachable from, gating `/run-public`
/// (spec §6) to the two types that are meant for direct browser use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentType {
    /// An embeddable chat widget.
    Widget,
    /// A standalone web application.
    Webapp,
    /// API-only; never publicly reachable.
    Api,
}

impl DeploymentType {
    /// Returns `true` for the two types `POST /run-public/{slug}` permits.
    #[must_use]
    pub fn is_public_eligible(self) -> bool {
        matches!(self, Self::Widget | Self::Webapp)
    }
}

/// A cron expression plus the timezone it is evaluated in (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBinding {
    /// Standard five-field cron expression.
    pub cron: String,
    /// IANA timezone name the cron fields are evaluated against.
    pub timezone: String,
    /// The most recent time this schedule fired, if ever.
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    /// The next time this schedule is due to fire.
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
}

/// A point-in-time graph snapshot published under a URL slug (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique identifier for this deployment.
    pub id: DeploymentId,
    /// The workflow this is a snapshot of.
    pub workflow_id: WorkflowId,
    /// Semantic version of this snapshot, bumped on every publish.
    pub version: Version,
    /// The frozen graph, captured at publish time.
    pub graph: Graph,
    /// The JSON schema extracted from the trigger node's declared inputs.
    pub input_schema: serde_json::Value,
    /// The JSON schema extracted from the terminal `answerNode`'s outputs.
    pub output_schema: serde_json::Value,
    /// The public URL slug this deployment is routed under.
    pub url_slug: String,
    /// Whether this is the currently active deployment for its app.
    ///
    /// Invariant (spec §3): at most one deployment per app has
    /// `active == true`; the gateway enforces this at write time.
    pub active: bool,
    /// Optional cron schedule binding this deployment to automatic runs.
    #[serde(default)]
    pub schedule: Option<ScheduleBinding>,
    /// The deployment's surface type, gating public reachability.
    pub deployment_type: DeploymentType,
}

impl Deployment {
    /// Returns `true` if this deployment may be called through
    /// `POST /run-public/{slug}` (spec §6).
    #[must_use]
    pub fn allows_public_run(&self) -> bool {
        self.active && self.deployment_type.is_public_eligible()
    }
}
