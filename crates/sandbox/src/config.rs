//! Sandbox scheduler configuration (spec §4.3): worker pool bounds,
//! per-job resource caps, fair-scheduling thresholds, and the dynamic
//! worker-sizing knobs, read from `MODULY_SANDBOX_*` environment
//! variables with spec.md's named defaults.

use std::env;
use std::time::Duration;

/// Tunable sandbox scheduler parameters.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Worker pool floor (default 2).
    pub min_workers: usize,
    /// Worker pool ceiling (default 8).
    pub max_workers: usize,

    /// Default per-job timeout when the caller does not specify one
    /// (default 10s).
    pub default_timeout: Duration,
    /// Hard ceiling a requested timeout is clamped to (default 60s).
    pub max_timeout: Duration,
    /// Per-job memory cap (default 128 MiB).
    pub max_memory_mb: u64,
    /// Per-job captured stdout/stderr cap, in bytes (default 1 MiB).
    pub max_output_bytes: usize,

    /// Total queue depth above which submissions are rejected with
    /// `Overloaded` (default 100).
    pub max_queue_size: usize,

    /// How often the EMA request-rate sample is refreshed (default 1s).
    pub scaling_interval: Duration,
    /// EMA weight given to the newest sample, in `(0, 1]` (default 0.2).
    pub ema_alpha: f64,
    /// Target requests-per-second each worker should absorb (default 2.0).
    pub target_rps_per_worker: f64,
    /// Minimum time between scale-down operations (default 30s).
    pub scale_down_cooldown: Duration,
    /// How long workers must sit idle before a scale-down is considered
    /// (default 30s).
    pub scale_down_idle_time: Duration,

    /// Per-tenant concurrent in-flight job cap (default 3).
    pub max_per_tenant: usize,
    /// Aging tick interval (default 5s).
    pub aging_interval: Duration,
    /// Wait time after which a `Low` job is promoted to `Normal`
    /// (default 15s).
    pub aging_threshold_low: Duration,
    /// Wait time after which a `Normal` job is promoted to `High`
    /// (default 30s).
    pub aging_threshold_normal: Duration,

    /// Allow outbound network from sandboxed jobs unless the caller
    /// opts in explicitly per job (default false).
    pub enable_network: bool,
    /// Run jobs as plain child processes with no namespace/rlimit
    /// isolation. Intended for local development on platforms without
    /// the Linux isolation primitives available.
    pub bypass_isolation: bool,
}

impl SandboxConfig {
    fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(default_secs), Duration::from_secs)
    }

    fn env_usize(key: &str, default: usize) -> usize {
        env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn env_u64(key: &str, default: u64) -> u64 {
        env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn env_f64(key: &str, default: f64) -> f64 {
        env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn env_bool(key: &str, default: bool) -> bool {
        env::var(key).ok().map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(default)
    }

    /// Build configuration from `MODULY_SANDBOX_*` environment
    /// variables, falling back to spec.md's named defaults when unset
    /// or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            min_workers: Self::env_usize("MODULY_SANDBOX_MIN_WORKERS", 2),
            max_workers: Self::env_usize("MODULY_SANDBOX_MAX_WORKERS", 8),
            default_timeout: Self::env_duration_secs("MODULY_SANDBOX_DEFAULT_TIMEOUT_SECS", 10),
            max_timeout: Self::env_duration_secs("MODULY_SANDBOX_MAX_TIMEOUT_SECS", 60),
            max_memory_mb: Self::env_u64("MODULY_SANDBOX_MAX_MEMORY_MB", 128),
            max_output_bytes: Self::env_usize("MODULY_SANDBOX_MAX_OUTPUT_BYTES", 1024 * 1024),
            max_queue_size: Self::env_usize("MODULY_SANDBOX_MAX_QUEUE_SIZE", 100),
            scaling_interval: Self::env_duration_secs("MODULY_SANDBOX_SCALING_INTERVAL_SECS", 1),
            ema_alpha: Self::env_f64("MODULY_SANDBOX_EMA_ALPHA", 0.2),
            target_rps_per_worker: Self::env_f64("MODULY_SANDBOX_TARGET_RPS_PER_WORKER", 2.0),
            scale_down_cooldown: Self::env_duration_secs("MODULY_SANDBOX_SCALE_DOWN_COOLDOWN_SECS", 30),
            scale_down_idle_time: Self::env_duration_secs("MODULY_SANDBOX_SCALE_DOWN_IDLE_SECS", 30),
            max_per_tenant: Self::env_usize("MODULY_SANDBOX_MAX_PER_TENANT", 3),
            aging_interval: Self::env_duration_secs("MODULY_SANDBOX_AGING_INTERVAL_SECS", 5),
            aging_threshold_low: Self::env_duration_secs("MODULY_SANDBOX_AGING_THRESHOLD_LOW_SECS", 15),
            aging_threshold_normal: Self::env_duration_secs("MODULY_SANDBOX_AGING_THRESHOLD_NORMAL_SECS", 30),
            enable_network: Self::env_bool("MODULY_SANDBOX_ENABLE_NETWORK", false),
            bypass_isolation: Self::env_bool("MODULY_SANDBOX_BYPASS_ISOLATION", !cfg!(target_os = "linux")),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 8,
            default_timeout: Duration::from_secs(10),
            max_timeout: Duration::from_secs(60),
            max_memory_mb: 128,
            max_output_bytes: 1024 * 1024,
            max_queue_size: 100,
            scaling_interval: Duration::from_secs(1),
            ema_alpha: 0.2,
            target_rps_per_worker: 2.0,
            scale_down_cooldown: Duration::from_secs(30),
            scale_down_idle_time: Duration::from_secs(30),
            max_per_tenant: 3,
            aging_interval: Duration::from_secs(5),
            aging_threshold_low: Duration::from_secs(15),
            aging_threshold_normal: Duration::from_secs(30),
            enable_network: false,
            bypass_isolation: !cfg!(target_os = "linux"),
        }
    }
}
