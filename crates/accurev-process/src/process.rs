use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::invocation::Invocation;
use crate::{ProcessError, Result};

/// How long the output readers may keep going once the child has exited.
/// A background process that inherited the pipes can hold them open far
/// longer; whatever arrived by then is used.
const READER_GRACE: Duration = Duration::from_secs(1);

type Captured = Arc<Mutex<Vec<u8>>>;

// ─── ToolRunner ───────────────────────────────────────────────────────────

/// Launches the accurev executable and captures what it prints.
///
/// Every call spawns an independent process, so a single runner can be
/// shared between concurrent operations.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    exe: PathBuf,
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            timeout: None,
        }
    }

    /// Kill the child and fail with [`ProcessError::TimedOut`] if it has not
    /// exited within `timeout`. `None` waits forever. Only the exit is timed;
    /// output still buffered in the pipes is collected afterwards.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.exe
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `true` when the configured executable can be located and run.
    pub fn is_available(&self) -> bool {
        self.resolve().is_ok()
    }

    /// Run `exe <command> <args…>` and return its stdout.
    ///
    /// stdout and stderr are drained by background tasks while the process
    /// runs, so a chatty child can never block on a full pipe. A non-zero
    /// exit yields [`ProcessError::ExternalTool`] carrying stdout followed by
    /// stderr; a zero exit returns stdout whatever stderr contains.
    pub async fn run(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        let exe = self.resolve()?;
        let tool = self.tool_name();

        let mut cmd = Command::new(&exe);
        cmd.arg(invocation.command())
            .args(invocation.arg_values())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = invocation.working_dir() {
            cmd.current_dir(dir);
        }

        debug!(tool = %tool, command = %invocation.display_line(), "running accurev");
        let started = Instant::now();

        let mut child = cmd.spawn().map_err(|e| spawn_error(&exe, e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Process("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessError::Process("stderr not captured".into()))?;
        let stdout_buf = Captured::default();
        let stderr_buf = Captured::default();
        let stdout_task = tokio::spawn(drain(stdout, Arc::clone(&stdout_buf)));
        let stderr_task = tokio::spawn(drain(stderr, Arc::clone(&stderr_buf)));

        let exited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };
        let status = match exited {
            Some(status) => status?,
            None => {
                let _ = child.kill().await;
                warn!(tool = %tool, command = %invocation.display_line(), "accurev timed out");
                return Err(ProcessError::TimedOut {
                    tool,
                    seconds: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
                });
            }
        };
        let stdout = collect(stdout_task, &stdout_buf, &tool).await?;
        let stderr = collect(stderr_task, &stderr_buf, &tool).await?;

        debug!(
            tool = %tool,
            status = %status,
            stdout_bytes = stdout.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "accurev exited"
        );

        if !status.success() {
            let mut output = stdout;
            output.extend_from_slice(&stderr);
            return Err(ProcessError::ExternalTool {
                tool,
                exit_code: status.code(),
                output: String::from_utf8_lossy(&output).trim_end().to_string(),
            });
        }

        if !stderr.is_empty() {
            debug!(tool = %tool, stderr = %String::from_utf8_lossy(&stderr).trim_end(), "accurev wrote to stderr");
        }

        Ok(stdout)
    }

    fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.exe).map_err(|e| ProcessError::ToolUnavailable {
            exe: self.exe.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn tool_name(&self) -> String {
        self.exe
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.exe.display().to_string())
    }
}

// ─── Internal ─────────────────────────────────────────────────────────────

/// Wait up to [`READER_GRACE`] for a reader to hit EOF, then take what it
/// captured. A reader still blocked after that is abandoned.
async fn collect(
    mut task: JoinHandle<std::io::Result<()>>,
    captured: &Captured,
    tool: &str,
) -> Result<Vec<u8>> {
    match tokio::time::timeout(READER_GRACE, &mut task).await {
        Ok(joined) => joined
            .map_err(|e| ProcessError::Process(format!("output reader failed: {e}")))??,
        Err(_) => {
            task.abort();
            debug!(tool = %tool, "output pipe still open after exit; using what was read");
        }
    }
    let mut buf = captured.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(std::mem::take(&mut *buf))
}

/// Read a pipe to EOF, appending bytes to `sink` in arrival order.
async fn drain<R: AsyncRead + Unpin>(mut reader: R, sink: Captured) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(&chunk[..n]);
    }
}

fn spawn_error(exe: &Path, err: std::io::Error) -> ProcessError {
    match err.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            ProcessError::ToolUnavailable {
                exe: exe.display().to_string(),
                reason: err.to_string(),
            }
        }
        _ => ProcessError::Io(err),
    }
}
