use crate::error::PlantUmlError;
use crate::types::{ProcessOutput, RenderConfig};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs the renderer to completion and captures its output.
///
/// The child is spawned with `kill_on_drop`, so hitting the timeout (which
/// drops the pending wait) also terminates the subprocess.
pub async fn run_plantuml(
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    config: &RenderConfig,
) -> Result<ProcessOutput, PlantUmlError> {
    let start_time = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (k, v) in &config.env {
        cmd.env(k, v);
    }

    let child = cmd.spawn().map_err(|e| PlantUmlError::SpawnFailed {
        program: program.display().to_string(),
        source: e,
    })?;

    match timeout(config.timeout, child.wait_with_output()).await {
        Ok(res) => {
            let output = res?;
            let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Err(_) => {
            tracing::warn!(
                event = "render_timeout",
                program = %program.display(),
                timeout_ms = u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
                "render_timeout"
            );
            Err(PlantUmlError::Timeout(config.timeout))
        }
    }
}
