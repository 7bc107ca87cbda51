//! Supervised background jobs
//!
//! A job is one execution of a family script. Its output and its exit are
//! delivered on two channels: an unbounded stream of output chunks and a
//! single-fire exit result. The exit result is sent only after both output
//! pipes are drained, so a consumer reading the output channel to its end
//! and then awaiting the exit sees every chunk before the exit.

use crossdev_core::{Error, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Process-wide command counter, shared by every SDK
static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// How long to wait for the output pipes to close once the process is gone.
/// Grandchildren inheriting the pipes can keep them open forever.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Allocate a new process-unique command id such as `sdk-install-3`
pub fn next_command_id(prefix: &str) -> String {
    let id = NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", prefix, id)
}

/// What to run
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub cmd_id: String,
    pub script: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Session the progress events are addressed to
    pub session_id: String,
    /// Id of the SDK owning the job
    pub sdk_id: String,
}

/// Identity of a running job, shared by its handle and its streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub cmd_id: String,
    pub session_id: String,
    pub sdk_id: String,
}

/// One piece of output; exactly one of the two fields is non-empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutput {
    pub stdout: String,
    pub stderr: String,
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobExit {
    /// Exit code, -1 when the process was killed or never reaped
    pub code: i32,
    /// Process level error (signal, timeout, wait failure)
    pub error: Option<String>,
}

impl JobExit {
    pub fn success(&self) -> bool {
        self.code == 0 && self.error.is_none()
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self { code, error: None },
            None => Self {
                code: -1,
                error: Some(describe_signal(status)),
            },
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            code: -1,
            error: Some(error.into()),
        }
    }
}

#[cfg(unix)]
fn describe_signal(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("terminated by signal {}", signal),
        None => format!("terminated abnormally ({})", status),
    }
}

#[cfg(not(unix))]
fn describe_signal(status: ExitStatus) -> String {
    format!("terminated abnormally ({})", status)
}

/// Control side of a running job
#[derive(Debug)]
pub struct JobHandle {
    info: JobInfo,
    kill: mpsc::UnboundedSender<()>,
}

impl JobHandle {
    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    /// Ask the supervisor to kill the process. The exit is still reported
    /// on the exit channel.
    pub fn kill(&self) {
        if self.kill.send(()).is_err() {
            debug!("Job {} already finished", self.info.cmd_id);
        }
    }
}

/// Consumer side of a running job
#[derive(Debug)]
pub struct JobStreams {
    pub info: JobInfo,
    pub output: mpsc::UnboundedReceiver<JobOutput>,
    pub exit: oneshot::Receiver<JobExit>,
}

/// Spawn the job's process and its supervisor task.
///
/// Must be called from within a Tokio runtime.
pub fn start(spec: JobSpec) -> Result<(JobHandle, JobStreams)> {
    let mut child = Command::new(&spec.script)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::ProcessSpawnFailure {
            script: spec.script.display().to_string(),
            source,
        })?;

    let info = JobInfo {
        cmd_id: spec.cmd_id,
        session_id: spec.session_id,
        sdk_id: spec.sdk_id,
    };

    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let (exit_tx, exit_rx) = oneshot::channel();
    let (kill_tx, kill_rx) = mpsc::unbounded_channel();

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, false, output_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, true, output_tx.clone()));
    }
    drop(output_tx);

    let cmd_id = info.cmd_id.clone();
    let timeout = spec.timeout;
    tokio::spawn(async move {
        let exit = supervise(&mut child, timeout, kill_rx, &cmd_id).await;
        drain(readers, &cmd_id).await;
        debug!("Job {} exited: code {}, error {:?}", cmd_id, exit.code, exit.error);
        let _ = exit_tx.send(exit);
    });

    Ok((
        JobHandle {
            info: info.clone(),
            kill: kill_tx,
        },
        JobStreams {
            info,
            output: output_rx,
            exit: exit_rx,
        },
    ))
}

async fn supervise(
    child: &mut Child,
    timeout: Duration,
    mut kill_rx: mpsc::UnboundedReceiver<()>,
    cmd_id: &str,
) -> JobExit {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => JobExit::from_status(status),
            Err(e) => JobExit::failed(format!("cannot wait for process: {}", e)),
        },
        _ = &mut deadline => {
            warn!("Job {} timed out after {:?}, killing it", cmd_id, timeout);
            if let Err(e) = child.kill().await {
                warn!("Cannot kill job {}: {}", cmd_id, e);
            }
            JobExit::failed(format!("command timed out after {}s", timeout.as_secs()))
        }
        Some(()) = kill_rx.recv() => {
            debug!("Killing job {}", cmd_id);
            if let Err(e) = child.start_kill() {
                warn!("Cannot kill job {}: {}", cmd_id, e);
            }
            match child.wait().await {
                Ok(status) => JobExit::from_status(status),
                Err(e) => JobExit::failed(format!("cannot wait for process: {}", e)),
            }
        }
    }
}

async fn drain(readers: Vec<JoinHandle<()>>, cmd_id: &str) {
    let aborts: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();
    let joined = tokio::time::timeout(PIPE_DRAIN_TIMEOUT, async {
        for reader in readers {
            let _ = reader.await;
        }
    })
    .await;

    if joined.is_err() {
        warn!("Output pipes of job {} still open after exit, dropping them", cmd_id);
        for abort in aborts {
            abort.abort();
        }
    }
}

fn spawn_reader<R>(
    pipe: R,
    is_stderr: bool,
    tx: mpsc::UnboundedSender<JobOutput>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line).into_owned();
                    let chunk = if is_stderr {
                        JobOutput {
                            stderr: text,
                            ..Default::default()
                        }
                    } else {
                        JobOutput {
                            stdout: text,
                            ..Default::default()
                        }
                    };
                    if tx.send(chunk).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Stopped reading job output: {}", e);
                    break;
                }
            }
        }
    })
}
