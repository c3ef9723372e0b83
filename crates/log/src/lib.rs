#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Log
//!
//! `tracing` initialization shared by every service binary. Reads
//! `MODULY_LOG` for the `EnvFilter` directive (default `info`) and
//! `MODULY_LOG_FORMAT` to pick between a human-readable format for local
//! development and structured JSON for production.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for the process-wide logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable, ANSI-colored, one line per event.
    Pretty,
    /// One JSON object per line, for log aggregators.
    Json,
}

impl Format {
    fn from_env() -> Self {
        match std::env::var("MODULY_LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Guard returned by [`init`]. Dropping it is harmless; it exists only
/// so callers have a value to hold onto for the lifetime of `main`,
/// mirroring the RAII pattern the rest of the workspace uses for
/// process-lifetime resources.
#[derive(Debug)]
pub struct LogGuard(());

/// Initialize the global `tracing` subscriber for this process.
///
/// Safe to call once per process; a second call is a no-op (the
/// underlying `tracing` global default can only be set once, and we
/// swallow the resulting error rather than panic, since tests commonly
/// call `init()` from many modules).
pub fn init() -> LogGuard {
    let filter = EnvFilter::try_from_env("MODULY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match Format::from_env() {
        Format::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        Format::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    if let Err(err) = result {
        tracing::trace!(%err, "tracing subscriber already initialized");
    }

    LogGuard(())
}

/// Initialize a subscriber suitable for `#[test]` functions: pretty
/// format, `debug` default level, idempotent across the test binary.
pub fn init_test() -> LogGuard {
    let filter = EnvFilter::try_from_env("MODULY_LOG").unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_target(true),
        )
        .try_init();
    LogGuard(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_env_defaults_to_pretty() {
        // SAFETY(test): single-threaded test, no concurrent env mutation.
        unsafe { std::env::remove_var("MODULY_LOG_FORMAT") };
        assert_eq!(Format::from_env(), Format::Pretty);
    }

    #[test]
    fn format_from_env_reads_json() {
        unsafe { std::env::set_var("MODULY_LOG_FORMAT", "json") };
        assert_eq!(Format::from_env(), Format::Json);
        unsafe { std::env::remove_var("MODULY_LOG_FORMAT") };
    }

    #[test]
    fn init_is_idempotent() {
        let _g1 = init_test();
        let _g2 = init_test();
    }
}
