//! The Sandbox API (spec §6): `POST /v1/sandbox/execute` submits a job
//! to the MLFQ scheduler; `GET /v1/sandbox/metrics` exposes its
//! counters.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::Json;
use moduly_ports::sandbox::{Job, Priority};
use moduly_value::Value;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::SandboxState;

#[derive(Debug, Deserialize)]
pub struct SandboxExecuteRequest {
    code: String,
    #[serde(default)]
    inputs: serde_json::Value,
    timeout_secs: u64,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    enable_network: bool,
    #[serde(default)]
    tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SandboxExecuteResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_type: Option<&'static str>,
    execution_time_ms: u128,
    /// Peak memory observed for the job, in megabytes.
    ///
    /// [`moduly_ports::sandbox::JobOutcome`] does not currently surface
    /// per-job memory usage (the isolation harness enforces the cap but
    /// doesn't report a peak back through the port), so this is always
    /// `null` rather than a fabricated number.
    memory_used_mb: Option<f64>,
}

fn parse_priority(priority: Option<&str>) -> Option<Priority> {
    match priority {
        Some("high") => Some(Priority::High),
        Some("normal") => Some(Priority::Normal),
        Some("low") => Some(Priority::Low),
        _ => None,
    }
}

/// `POST /v1/sandbox/execute`.
pub async fn execute(
    State(state): State<SandboxState>,
    Json(body): Json<SandboxExecuteRequest>,
) -> Result<Json<SandboxExecuteResponse>, ApiError> {
    let job = Job {
        code: body.code,
        inputs: Value::new(body.inputs),
        timeout: Duration::from_secs(body.timeout_secs),
        priority: parse_priority(body.priority.as_deref()),
        tenant_id: body.tenant_id.unwrap_or_else(|| "default".to_string()),
        enable_network: body.enable_network,
    };
    let started = Instant::now();
    let outcome = state.scheduler.execute(job).await.map_err(ApiError)?;
    let execution_time_ms = started.elapsed().as_millis();
    Ok(Json(SandboxExecuteResponse {
        success: outcome.success,
        result: outcome.result.map(Value::into_json),
        error: outcome.error,
        error_type: if outcome.success { None } else { Some("runtime_error") },
        execution_time_ms,
        memory_used_mb: None,
    }))
}

#[derive(Debug, Serialize)]
pub struct SandboxMetricsResponse {
    queue_high: usize,
    queue_normal: usize,
    queue_low: usize,
    running_count: usize,
    total_submitted: u64,
    total_completed: u64,
    total_failed: u64,
    total_aged: u64,
    current_workers: usize,
    min_workers: usize,
    max_workers: usize,
    ema_rps: f64,
    active_tenants: usize,
}

/// `GET /v1/sandbox/metrics`.
pub async fn metrics(State(state): State<SandboxState>) -> Json<SandboxMetricsResponse> {
    let m = state.scheduler.metrics();
    Json(SandboxMetricsResponse {
        queue_high: m.queue_high,
        queue_normal: m.queue_normal,
        queue_low: m.queue_low,
        running_count: m.running_count,
        total_submitted: m.total_submitted,
        total_completed: m.total_completed,
        total_failed: m.total_failed,
        total_aged: m.total_aged,
        current_workers: m.current_workers,
        min_workers: m.min_workers,
        max_workers: m.max_workers,
        ema_rps: m.ema_rps,
        active_tenants: m.active_tenants,
    })
}
