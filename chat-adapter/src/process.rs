//! Subprocess execution and lifecycle management for chat agents.

use crate::error::ChatError;
use crate::types::{ChatConfig, RunResult};
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Per-stream capture limit.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
const GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Everything read from one stream of the agent.
#[derive(Debug)]
struct Capture {
    stream: Stream,
    text: String,
    overflowed: bool,
}

impl Capture {
    fn new(stream: Stream) -> Self {
        Self {
            stream,
            text: String::new(),
            overflowed: false,
        }
    }

    fn push_line(&mut self, line: &str) {
        let needed = line.len() + usize::from(!self.text.is_empty());
        if self.text.len() + needed > MAX_OUTPUT_BYTES {
            self.overflowed = true;
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }
}

/// Spawns the agent with `args` and collects its output.
///
/// # Errors
/// Returns a [`ChatError`] if the process cannot be spawned, times out,
/// writes more than 10 MB to either stream, or an I/O failure occurs. A
/// non-zero exit is *not* an error here; callers decide how to treat it.
pub async fn run_agent(path: &Path, args: &[OsString], config: &ChatConfig) -> Result<RunResult, ChatError> {
    let started = Instant::now();
    let mut child = spawn_child(path, args, config)?;
    let pid = child.id().ok_or(ChatError::MissingHandle("pid"))?;

    let mut readers = JoinSet::new();
    readers.spawn(capture(child.stdout.take().ok_or(ChatError::MissingHandle("stdout"))?, Stream::Stdout));
    readers.spawn(capture(child.stderr.take().ok_or(ChatError::MissingHandle("stderr"))?, Stream::Stderr));

    let finished = timeout(config.timeout, wait_for_agent(&mut child, &mut readers)).await;
    let elapsed = started.elapsed();
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    let Ok(finished) = finished else {
        tracing::warn!(event = "agent_timeout", pid, elapsed_ms = duration_ms, "agent_timeout");
        if let Err(e) = terminate(&mut child, pid).await {
            tracing::warn!(event = "agent_shutdown_failed", pid, error = %e, "agent_shutdown_failed");
        }
        readers.abort_all();
        return Err(ChatError::Timeout { elapsed, pid });
    };

    let (stdout, stderr, status) = finished?;
    tracing::debug!(
        event = "agent_exited",
        pid,
        exit_code = status.code(),
        stdout_bytes = stdout.len(),
        duration_ms,
        "agent_exited"
    );
    Ok(RunResult {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(-1),
        duration_ms,
    })
}

fn spawn_child(path: &Path, args: &[OsString], config: &ChatConfig) -> Result<Child, ChatError> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .envs(config.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &config.cwd {
        cmd.current_dir(dir);
    }

    cmd.spawn().map_err(|source| ChatError::SpawnFailed {
        stage: "spawn".to_string(),
        source,
    })
}

/// Waits for both readers and then for the process itself.
async fn wait_for_agent(
    child: &mut Child,
    readers: &mut JoinSet<Capture>,
) -> Result<(String, String, ExitStatus), ChatError> {
    let mut stdout = String::new();
    let mut stderr = String::new();

    while let Some(joined) = readers.join_next().await {
        let captured = joined.map_err(|source| ChatError::StreamFailed {
            stage: "join".to_string(),
            source,
        })?;
        if captured.overflowed {
            return Err(ChatError::OutputTruncated {
                captured_bytes: captured.text.len(),
                limit_bytes: MAX_OUTPUT_BYTES,
            });
        }
        match captured.stream {
            Stream::Stdout => stdout = captured.text,
            Stream::Stderr => stderr = captured.text,
        }
    }

    let status = child.wait().await.map_err(|source| ChatError::SpawnFailed {
        stage: "wait".to_string(),
        source,
    })?;
    Ok((stdout, stderr, status))
}

/// Reads `reader` to the end. Lines past the limit are dropped but still
/// consumed so the agent never blocks on a full pipe.
async fn capture(reader: impl AsyncRead + Unpin, stream: Stream) -> Capture {
    let mut lines = BufReader::new(reader).lines();
    let mut captured = Capture::new(stream);
    while let Ok(Some(line)) = lines.next_line().await {
        captured.push_line(&line);
    }
    captured
}

/// Sends `SIGTERM`, waits out the grace period, then kills.
#[cfg(unix)]
async fn terminate(child: &mut Child, pid: u32) -> Result<(), ChatError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let signal_failed = |reason: String| ChatError::SignalFailed {
        signal: "SIGTERM".to_string(),
        pid,
        reason,
    };
    let raw = i32::try_from(pid).map_err(|_| signal_failed("pid does not fit in i32".to_string()))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|e| signal_failed(e.to_string()))?;

    if timeout(GRACE_PERIOD, child.wait()).await.is_err() {
        tracing::warn!(event = "agent_sigkill", pid, "agent_sigkill");
        child.kill().await.map_err(|source| ChatError::SpawnFailed {
            stage: "kill".to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Console processes on Windows get no graceful stop.
#[cfg(windows)]
async fn terminate(child: &mut Child, _pid: u32) -> Result<(), ChatError> {
    child.kill().await.map_err(|source| ChatError::SpawnFailed {
        stage: "kill".to_string(),
        source,
    })
}
