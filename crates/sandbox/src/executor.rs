//! Isolated job execution (spec §4.3 "Isolated execution"): each job
//! runs as a fresh child process, restricted by the Linux isolation
//! layer when available, with its result read back as a single JSON
//! object on stdout.

use std::env;
use std::process::Stdio;
use std::time::Duration;

use moduly_error::Error;
use moduly_ports::sandbox::{Job, JobOutcome};
use moduly_value::Value;
use serde::Deserialize;
use tempfile::Builder;
use tokio::process::Command;

use crate::config::SandboxConfig;

/// The child process's stdout contract: exactly one JSON object.
#[derive(Debug, Deserialize)]
struct ChildResult {
    success: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Runs one job to completion in a fresh child process.
///
/// A job's own failure (the code raised, returned a non-dict, or
/// produced unparsable output) is reported as a non-`success`
/// [`JobOutcome`], never as an `Err`. An `Err` means the isolation
/// harness itself could not run the job at all.
pub struct Executor {
    config: SandboxConfig,
    interpreter_path: String,
}

impl Executor {
    /// Build an executor over `config`, resolving the interpreter
    /// binary from `MODULY_SANDBOX_INTERPRETER_PATH` (default
    /// `python3` on `PATH`).
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        let interpreter_path = env::var("MODULY_SANDBOX_INTERPRETER_PATH").unwrap_or_else(|_| "python3".into());
        Self { config, interpreter_path }
    }

    /// Execute `job`, enforcing its (clamped) timeout and the
    /// configured memory/output caps.
    pub async fn execute(&self, job: &Job) -> Result<JobOutcome, Error> {
        let timeout = job.timeout.min(self.config.max_timeout);
        let script = self.wrapper_script(&job.code, &job.inputs);

        let dir = Builder::new()
            .prefix("moduly-sandbox-")
            .tempdir()
            .map_err(|e| Error::SandboxIsolation(format!("failed to create temp dir: {e}")))?;
        let script_path = dir.path().join("job.py");
        tokio::fs::write(&script_path, script)
            .await
            .map_err(|e| Error::SandboxIsolation(format!("failed to write job script: {e}")))?;

        let mut command = Command::new(&self.interpreter_path);
        command
            .arg(&script_path)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(target_os = "linux")]
        if !self.config.bypass_isolation {
            crate::isolation::restrict(
                &mut command,
                dir.path(),
                self.config.max_memory_mb,
                timeout,
                job.enable_network,
            );
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::SandboxIsolation(format!("failed to spawn sandbox process: {e}")))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => self.parse_output(&output.stdout, &output.stderr, output.status.success()),
            Ok(Err(io_error)) => Err(Error::SandboxIsolation(format!("sandbox process error: {io_error}"))),
            Err(_elapsed) => Err(Error::SandboxTimeout(timeout)),
        }
    }

    fn wrapper_script(&self, user_code: &str, inputs: &Value) -> String {
        let inputs_json = serde_json::to_string(inputs.as_json()).unwrap_or_else(|_| "{}".into());
        let inputs_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, inputs_json);
        format!(
            r#"import base64
import json
import sys

{user_code}

try:
    inputs = json.loads(base64.b64decode("{inputs_b64}").decode("utf-8"))
    result = main(inputs)
    if not isinstance(result, dict):
        raise TypeError("main() must return a dict")
    json.dumps(result)
    print(json.dumps({{"success": True, "result": result}}))
except Exception as exc:
    print(json.dumps({{"success": False, "error": str(exc)}}))
    sys.exit(1)
"#,
            user_code = user_code,
            inputs_b64 = inputs_b64,
        )
    }

    fn parse_output(&self, stdout: &[u8], stderr: &[u8], exited_ok: bool) -> Result<JobOutcome, Error> {
        let cap = self.config.max_output_bytes;
        let stdout = truncate(stdout, cap);
        let stderr = truncate(stderr, cap);

        if stdout.trim().is_empty() {
            if exited_ok {
                return Err(Error::SandboxIsolation("sandbox process produced no output".into()));
            }
            return Ok(JobOutcome {
                success: false,
                result: None,
                error: Some(format!("process exited with no stdout; stderr: {stderr}")),
            });
        }

        let last_line = stdout.lines().next_back().unwrap_or_default();
        match serde_json::from_str::<ChildResult>(last_line) {
            Ok(parsed) if parsed.success => Ok(JobOutcome {
                success: true,
                result: parsed.result.map(Value::new),
                error: None,
            }),
            Ok(parsed) => Ok(JobOutcome {
                success: false,
                result: None,
                error: Some(parsed.error.unwrap_or_else(|| "job raised an unspecified error".into())),
            }),
            Err(_) => Err(Error::SandboxIsolation(format!(
                "sandbox process produced non-JSON output: {stdout}"
            ))),
        }
    }
}

fn truncate(bytes: &[u8], cap: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= cap {
        text.into_owned()
    } else {
        let mut boundary = cap;
        while boundary > 0 && !text.is_char_boundary(boundary) {
            boundary -= 1;
        }
        text[..boundary].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_does_not_split_a_multibyte_char_at_the_cap() {
        // "é" is 2 bytes (0xC3 0xA9); a naive byte-offset cap of 1 would
        // slice inside it and panic.
        let bytes = "é".as_bytes();
        assert_eq!(truncate(bytes, 1), "");
        assert_eq!(truncate(bytes, 2), "é");
    }

    #[test]
    fn truncate_passes_through_short_input() {
        assert_eq!(truncate(b"ok", 10), "ok");
    }
}

/// Wall-clock budget used when a job timeout is not itself informative
/// (kept for documentation symmetry with spec.md's named default).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
