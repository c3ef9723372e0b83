//! The Run API (spec §6): `POST /run/{slug}`, `POST /run-public/{slug}`,
//! `POST /run-async/{slug}`, `GET /run-status/{run_id}`, and
//! `GET /deployments/public/{slug}/info`.
//!
//! The streaming handlers all follow the same shape (spec §2 flow):
//! resolve the slug to its active deployment, generate a `run_id`,
//! subscribe to `run:{run_id}` *before* enqueuing so no event can be
//! published and missed in the gap, enqueue the `workflow.execute`
//! task, then relay published events until a terminal one or the idle
//! timeout closes the stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use futures::stream::Stream;
use moduly_core::{DeploymentId, RunId, TriggerMode};
use moduly_error::Error;
use moduly_execution::JournalRecord;
use moduly_value::Value;
use moduly_workflow::Deployment;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;
use crate::workflow_task::WorkflowExecuteTask;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    inputs: serde_json::Value,
}

async fn resolve_active_deployment(state: &GatewayState, slug: &str) -> Result<Deployment, Error> {
    let value = state
        .deployment_repo
        .get_active_by_slug(slug)
        .await?
        .ok_or_else(|| Error::not_found("Deployment", slug))?;
    serde_json::from_value(value.into_json())
        .map_err(|e| Error::Internal(format!("stored deployment failed to deserialize: {e}")))
}

async fn start_run(
    state: &GatewayState,
    deployment: &Deployment,
    user_id: Option<moduly_core::UserId>,
    trigger_mode: TriggerMode,
    inputs: serde_json::Value,
) -> Result<RunId, Error> {
    let run_id = RunId::v4();
    start_run_with_id(state, run_id, deployment, user_id, trigger_mode, inputs).await?;
    Ok(run_id)
}

/// Enqueue `workflow.execute` for a run id the caller already
/// generated — used by the streaming handlers, which must subscribe to
/// `run:{run_id}` before this enqueue to avoid missing early events.
async fn start_run_with_id(
    state: &GatewayState,
    run_id: RunId,
    deployment: &Deployment,
    user_id: Option<moduly_core::UserId>,
    trigger_mode: TriggerMode,
    inputs: serde_json::Value,
) -> Result<(), Error> {
    let task = WorkflowExecuteTask {
        run_id,
        workflow_id: deployment.workflow_id,
        graph: deployment.graph.clone(),
        inputs: Value::new(inputs),
        user_id,
        trigger_mode,
        enqueued_at: Utc::now(),
    };
    let payload = Value::new(
        serde_json::to_value(&task).map_err(|e| Error::Internal(format!("task serialization failed: {e}")))?,
    );
    state.workflow_queue.enqueue(payload).await?;
    Ok(())
}

fn event_stream(
    config: crate::config::GatewayConfig,
    mut subscription: moduly_ports::Subscription,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let deadline = tokio::time::Instant::now() + config.run_deadline;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let idle = config.sse_idle_timeout.min(remaining);
            if idle.is_zero() {
                yield Ok(Event::default().event("error").data("run deadline exceeded"));
                return;
            }
            match subscription.recv(idle).await {
                Some(event) => {
                    let is_terminal = serde_json::from_value::<JournalRecord>(event.clone().into_json())
                        .map(|record| record.entry.is_terminal())
                        .unwrap_or(false);
                    yield Ok(Event::default().data(event.into_json().to_string()));
                    if is_terminal {
                        return;
                    }
                }
                None => {
                    yield Ok(Event::default().event("error").data("idle timeout waiting for next event"));
                    return;
                }
            }
        }
    }
}

/// `POST /run/{slug}` — authenticated synchronous SSE run.
pub async fn run(
    State(state): State<GatewayState>,
    Path(slug): Path<String>,
    _user: AuthUser,
    Json(body): Json<RunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let deployment = resolve_active_deployment(&state, &slug).await.map_err(ApiError)?;
    // Subscribe before enqueuing the run so no event published between
    // enqueue and the first stream poll can be missed (spec §2 flow) —
    // `tokio::sync::broadcast` does not replay to late subscribers.
    let run_id = RunId::v4();
    let subscription = state.event_bus.subscribe(&format!("run:{run_id}")).await.map_err(ApiError)?;
    start_run_with_id(&state, run_id, &deployment, Some(_user.0), TriggerMode::Api, body.inputs)
        .await
        .map_err(ApiError)?;
    Ok(Sse::new(event_stream(state.config.clone(), subscription)).keep_alive(KeepAlive::default()))
}

/// `POST /run-public/{slug}` — unauthenticated SSE run, gated on the
/// deployment's surface type (spec §6).
pub async fn run_public(
    State(state): State<GatewayState>,
    Path(slug): Path<String>,
    Json(body): Json<RunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let deployment = resolve_active_deployment(&state, &slug).await.map_err(ApiError)?;
    if !deployment.allows_public_run() {
        return Err(ApiError(Error::PublicAccessDenied(format!(
            "deployment {slug} is not publicly reachable"
        ))));
    }
    let run_id = RunId::v4();
    let subscription = state.event_bus.subscribe(&format!("run:{run_id}")).await.map_err(ApiError)?;
    start_run_with_id(&state, run_id, &deployment, None, TriggerMode::Api, body.inputs)
        .await
        .map_err(ApiError)?;
    Ok(Sse::new(event_stream(state.config.clone(), subscription)).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Serialize)]
pub struct AsyncRunResponse {
    run_id: RunId,
    task_id: DeploymentId,
    status: &'static str,
}

/// `POST /run-async/{slug}` — enqueue and return immediately.
pub async fn run_async(
    State(state): State<GatewayState>,
    Path(slug): Path<String>,
    user: AuthUser,
    Json(body): Json<RunRequest>,
) -> Result<Json<AsyncRunResponse>, ApiError> {
    let deployment = resolve_active_deployment(&state, &slug).await.map_err(ApiError)?;
    let run_id = start_run(&state, &deployment, Some(user.0), TriggerMode::Api, body.inputs)
        .await
        .map_err(ApiError)?;
    Ok(Json(AsyncRunResponse {
        run_id,
        task_id: DeploymentId::v4(),
        status: "pending",
    }))
}

#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    run_id: RunId,
    status: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
}

/// `GET /run-status/{run_id}` — point-in-time run status (spec §6).
pub async fn run_status(
    State(state): State<GatewayState>,
    Path(run_id): Path<RunId>,
) -> Result<Json<RunStatusResponse>, ApiError> {
    let row = state
        .run_repo
        .get_run(run_id)
        .await
        .map_err(ApiError)?
        .ok_or_else(|| ApiError(Error::not_found("Run", run_id.to_string())))?;
    let row = row.into_json();
    let started_at = row.get("started_at").cloned();
    let finished_at = row.get("finished_at").cloned();
    let duration = match (
        started_at.as_ref().and_then(|v| v.as_str()).and_then(|s| s.parse::<chrono::DateTime<Utc>>().ok()),
        finished_at.as_ref().and_then(|v| v.as_str()).and_then(|s| s.parse::<chrono::DateTime<Utc>>().ok()),
    ) {
        (Some(start), Some(finish)) => Some((finish - start).num_milliseconds() as f64 / 1000.0),
        _ => None,
    };
    Ok(Json(RunStatusResponse {
        run_id,
        status: row.get("status").cloned().unwrap_or(serde_json::Value::Null),
        outputs: row.get("output").cloned(),
        error_message: row.get("error_message").cloned(),
        started_at,
        finished_at,
        duration,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeploymentInfoResponse {
    url_slug: String,
    version: String,
    description: Option<String>,
    #[serde(rename = "type")]
    deployment_type: serde_json::Value,
    input_schema: serde_json::Value,
    output_schema: serde_json::Value,
}

/// `GET /deployments/public/{slug}/info` — public deployment metadata
/// (spec §6). Only ever resolves the active deployment for a slug; the
/// response has no `description` field in the [`Deployment`] type this
/// crate persists (that is app-level CRUD metadata, out of scope per
/// spec's Non-goals), so it is always `null` here.
pub async fn deployment_public_info(
    State(state): State<GatewayState>,
    Path(slug): Path<String>,
) -> Result<Json<DeploymentInfoResponse>, ApiError> {
    let deployment = resolve_active_deployment(&state, &slug).await.map_err(ApiError)?;
    Ok(Json(DeploymentInfoResponse {
        url_slug: deployment.url_slug,
        version: deployment.version.to_string(),
        description: None,
        deployment_type: serde_json::to_value(deployment.deployment_type).unwrap_or(serde_json::Value::Null),
        input_schema: deployment.input_schema,
        output_schema: deployment.output_schema,
    }))
}
