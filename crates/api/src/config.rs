//! Per-service configuration (SPEC_FULL.md §1.3): one `Config` struct
//! per binary, each with a `from_env()` reading `MODULY_*` environment
//! variables with spec.md's named defaults, modeled on
//! `moduly-engine::EngineConfig`/`moduly-sandbox::SandboxConfig`'s
//! env-only loader.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the Gateway service (spec §2, §6).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to (default `0.0.0.0:8080`).
    pub bind_addr: SocketAddr,
    /// Secret used to validate bearer JWTs on run endpoints.
    ///
    /// Empty by default so local development doesn't require minting a
    /// token; [`crate::auth::require_user`] treats an empty secret as
    /// "auth disabled" the same way the teacher's `ApiConfig::for_test`
    /// bypasses the JWT gate for tests, never in a production build.
    pub jwt_secret: String,
    /// How long an SSE subscriber waits for the next event before
    /// giving up (spec §4.2 "idle-read timeout").
    pub sse_idle_timeout: Duration,
    /// How long `POST /run/{slug}` waits for the run to reach a
    /// terminal event before the connection is dropped.
    pub run_deadline: Duration,
}

impl GatewayConfig {
    fn env_u64(key: &str, default: u64) -> u64 {
        env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    /// Build configuration from `MODULY_GATEWAY_*` environment
    /// variables, falling back to spec.md's named defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = env::var("MODULY_GATEWAY_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8080".parse().unwrap());
        Self {
            bind_addr,
            jwt_secret: env::var("MODULY_GATEWAY_JWT_SECRET").unwrap_or_default(),
            sse_idle_timeout: Duration::from_secs(Self::env_u64("MODULY_GATEWAY_SSE_IDLE_SECS", 30)),
            run_deadline: Duration::from_secs(Self::env_u64("MODULY_GATEWAY_RUN_DEADLINE_SECS", 600)),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            jwt_secret: String::new(),
            sse_idle_timeout: Duration::from_secs(30),
            run_deadline: Duration::from_secs(600),
        }
    }
}

/// Configuration for the sandbox service's HTTP surface (spec §6
/// "Sandbox API"). The scheduler's own tunables live in
/// [`moduly_sandbox::SandboxConfig`]; this is only the bind address.
#[derive(Debug, Clone)]
pub struct SandboxServiceConfig {
    /// Address the sandbox HTTP server binds to (default `0.0.0.0:8081`).
    pub bind_addr: SocketAddr,
}

impl SandboxServiceConfig {
    /// Build configuration from `MODULY_SANDBOX_SERVICE_BIND_ADDR`,
    /// falling back to `0.0.0.0:8081`.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = env::var("MODULY_SANDBOX_SERVICE_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8081".parse().unwrap());
        Self { bind_addr }
    }
}

impl Default for SandboxServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".parse().unwrap(),
        }
    }
}

/// Configuration for the retrieval service's HTTP surface (spec §4.4).
///
/// `/v1/retrieval/*` is not named by spec §6 — the retrieval core is
/// invoked in-process by the engine's RAG node (out of scope per spec
/// §1) in the original design — but exposing it as its own bindable
/// service matches the component table's "Retrieval Service" entry and
/// lets the sync/search pipeline run independently of a node
/// implementation existing yet.
#[derive(Debug, Clone)]
pub struct RetrievalServiceConfig {
    /// Address the retrieval HTTP server binds to (default `0.0.0.0:8082`).
    pub bind_addr: SocketAddr,
    /// RRF fusion constant (spec §4.4, default 60).
    pub rrf_constant: u32,
}

impl RetrievalServiceConfig {
    /// Build configuration from `MODULY_RETRIEVAL_*` environment
    /// variables, falling back to spec.md's named defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = env::var("MODULY_RETRIEVAL_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8082".parse().unwrap());
        let rrf_constant = env::var("MODULY_RETRIEVAL_RRF_CONSTANT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        Self { bind_addr, rrf_constant }
    }
}

impl Default for RetrievalServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8082".parse().unwrap(),
            rrf_constant: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_defaults_match_spec() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.run_deadline, Duration::from_secs(600));
        assert!(config.jwt_secret.is_empty());
    }

    #[test]
    fn sandbox_service_default_port() {
        assert_eq!(SandboxServiceConfig::default().bind_addr.port(), 8081);
    }

    #[test]
    fn retrieval_service_default_rrf_constant() {
        assert_eq!(RetrievalServiceConfig::default().rrf_constant, 60);
    }
}
