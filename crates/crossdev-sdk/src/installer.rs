//! SDK install and removal
//!
//! [`CrossSdk`] wraps one SDK record with its family scripts and drives the
//! state machine
//!
//! ```text
//! NotInstalled -> Installing -> Installed | NotInstalled (failure)
//! Installed -> Uninstalling -> NotInstalled
//! ```
//!
//! Installs run the family `add` script as a background job. Its output is
//! buffered and forwarded to the caller's UI session as
//! [`SdkManagementMsg`] events; buffering bounds the event rate so the UI is
//! not flooded with one frame per line.

use crate::catalog::CatalogReconciler;
use crate::family::{run_script, ScriptRole, SdkFamily};
use crate::identity::validate_sdk;
use crate::job::{self, JobExit, JobHandle, JobInfo, JobOutput, JobSpec, JobStreams};
use crate::session::{EventSink, SessionRegistry};
use crossdev_core::types::{
    Sdk, SdkManagementMsg, SdkStatus, DEFAULT_INSTALL_TIMEOUT_SECS, DEFAULT_STDERR_THRESHOLD,
    DEFAULT_STDOUT_THRESHOLD, EVT_SDK_INSTALL,
};
use crossdev_core::utils::one_line;
use crossdev_core::{Error, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Environment variable overriding the stdout buffering threshold
pub const ENV_BUF_STDOUT: &str = "CROSSDEV_SDK_BUF_STDOUT";

/// Environment variable overriding the stderr buffering threshold
pub const ENV_BUF_STDERR: &str = "CROSSDEV_SDK_BUF_STDERR";

/// Progress value of buffer flushes while the job runs
const PROGRESS_RUNNING: u8 = 0;

/// Progress value of the final flush right before the exit event
const PROGRESS_FINAL_FLUSH: u8 = 50;

/// Sizes above which buffered output is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferThresholds {
    pub stdout: usize,
    pub stderr: usize,
}

impl Default for BufferThresholds {
    fn default() -> Self {
        Self {
            stdout: DEFAULT_STDOUT_THRESHOLD,
            stderr: DEFAULT_STDERR_THRESHOLD,
        }
    }
}

impl BufferThresholds {
    /// Apply `CROSSDEV_SDK_BUF_STDOUT` / `CROSSDEV_SDK_BUF_STDERR`.
    /// Values that are not numbers are ignored.
    pub fn with_env_overrides(self) -> Self {
        Self {
            stdout: env_usize(ENV_BUF_STDOUT).unwrap_or(self.stdout),
            stderr: env_usize(ENV_BUF_STDERR).unwrap_or(self.stderr),
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={}: not a number", name, value);
            None
        }
    }
}

/// Accumulated job output waiting to be emitted
#[derive(Debug, Default)]
struct OutputBuffers {
    stdout: String,
    stderr: String,
}

impl OutputBuffers {
    fn push(&mut self, chunk: JobOutput) {
        self.stdout.push_str(&chunk.stdout);
        self.stderr.push_str(&chunk.stderr);
    }

    fn exceeds(&self, thresholds: &BufferThresholds) -> bool {
        self.stdout.len() > thresholds.stdout || self.stderr.len() > thresholds.stderr
    }

    fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    fn take(&mut self) -> (String, String) {
        (
            std::mem::take(&mut self.stdout),
            std::mem::take(&mut self.stderr),
        )
    }
}

/// Per-SDK install settings
#[derive(Debug, Clone, Copy)]
pub struct SdkOptions {
    /// Buffering thresholds; environment overrides are applied on top at
    /// every install
    pub thresholds: BufferThresholds,
    /// Timeout of install requests that carry none
    pub default_timeout: Duration,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            thresholds: BufferThresholds::default(),
            default_timeout: Duration::from_secs(DEFAULT_INSTALL_TIMEOUT_SECS),
        }
    }
}

/// Where the `add` script gets the SDK from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// Local SDK installer file
    File(String),
    /// Explicit download URL
    Url(String),
    /// URL recorded in the catalog
    Catalog,
}

/// Parameters of one install request
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub source: InstallSource,
    pub force: bool,
    /// Falls back to the SDK's default timeout when unset
    pub timeout: Option<Duration>,
    pub session_id: String,
}

impl InstallRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            source: InstallSource::Catalog,
            force: false,
            timeout: None,
            session_id: session_id.into(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.source = InstallSource::File(file.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source = InstallSource::Url(url.into());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The job currently attached to an SDK
struct ActiveJob {
    handle: JobHandle,
    /// Turns true once the job is detached and its terminal event emitted
    released: watch::Receiver<bool>,
}

struct Inner {
    sdk: RwLock<Sdk>,
    family: Arc<SdkFamily>,
    sessions: Arc<dyn SessionRegistry>,
    thresholds: BufferThresholds,
    default_timeout: Duration,
    job: Mutex<Option<ActiveJob>>,
}

impl Inner {
    fn sdk(&self) -> RwLockReadGuard<'_, Sdk> {
        self.sdk.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sdk_mut(&self) -> RwLockWriteGuard<'_, Sdk> {
        self.sdk.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn job(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.job.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Sdk {
        self.sdk().clone()
    }

    /// Output and exit must belong to the SDK that launched the job
    fn check_owner(&self, info: &JobInfo) {
        let sdk = self.sdk();
        if info.sdk_id != sdk.id {
            error!(
                "BUG: sdk ID differs: {} != {} (cmd {})",
                info.sdk_id, sdk.id, info.cmd_id
            );
        }
    }

    fn emit(&self, sink: &dyn EventSink, info: &JobInfo, msg: &SdkManagementMsg) {
        if let Err(e) = sink.emit(EVT_SDK_INSTALL, msg) {
            error!("Emit of {} failed (cmd {}): {}", EVT_SDK_INSTALL, info.cmd_id, e);
        }
    }

    /// Locate the freshly installed SDK on disk and validate the resulting
    /// record. Runs without holding the SDK lock.
    fn installed_record(&self) -> std::result::Result<Sdk, String> {
        let mut sdk = self.snapshot();
        let root = &self.family.config.root_dir;
        let installs = CatalogReconciler::for_family(&self.family)
            .and_then(|reconciler| reconciler.scan())
            .map_err(|e| format!("cannot scan {}: {}", root, e))?;
        let install = installs
            .into_iter()
            .find(|install| install.matches(&sdk))
            .ok_or_else(|| format!("installed SDK not found below {}", root))?;

        sdk.status = SdkStatus::Installed;
        sdk.path = install.path.to_string_lossy().to_string();
        sdk.setup_file = install.setup_file.to_string_lossy().to_string();
        sdk.date = install.date;
        validate_sdk(sdk, &self.family.config).map_err(|e| e.to_string())
    }

    /// Apply the job result to the SDK record
    fn finish(&self, exit: &JobExit) -> Sdk {
        let located = exit.success().then(|| self.installed_record());

        let mut sdk = self.sdk_mut();
        match located {
            Some(Ok(installed)) => {
                sdk.status = SdkStatus::Installed;
                sdk.path = installed.path;
                sdk.setup_file = installed.setup_file;
                sdk.date = installed.date;
                sdk.last_error.clear();
            }
            Some(Err(reason)) => {
                sdk.status = SdkStatus::NotInstalled;
                sdk.last_error = format!("Installation failed: {}", reason);
            }
            None => {
                let mut message = format!("Installation failed (code {})", exit.code);
                if let Some(err) = &exit.error {
                    message.push_str(". Error: ");
                    message.push_str(err);
                }
                sdk.status = SdkStatus::NotInstalled;
                sdk.last_error = message;
            }
        }
        sdk.clone()
    }

    /// Consume the job's output and exit, turning them into progress events
    async fn stream_job(
        self: Arc<Self>,
        mut streams: JobStreams,
        thresholds: BufferThresholds,
        released: watch::Sender<bool>,
    ) {
        let info = streams.info.clone();
        let mut buffers = OutputBuffers::default();

        while let Some(chunk) = streams.output.recv().await {
            self.check_owner(&info);

            if !chunk.stdout.is_empty() {
                trace!("STDOUT <<{}>>", one_line(&chunk.stdout));
            }
            if !chunk.stderr.is_empty() {
                trace!("STDERR <<{}>>", one_line(&chunk.stderr));
            }

            let Some(sink) = self.sessions.sink(&info.session_id) else {
                debug!(
                    "{} not emitted: session {} closed (cmd {})",
                    EVT_SDK_INSTALL, info.session_id, info.cmd_id
                );
                continue;
            };

            buffers.push(chunk);
            if buffers.exceeds(&thresholds) {
                let (stdout, stderr) = buffers.take();
                let msg = SdkManagementMsg::output(
                    &info.cmd_id,
                    self.snapshot(),
                    PROGRESS_RUNNING,
                    stdout,
                    stderr,
                );
                self.emit(sink.as_ref(), &info, &msg);
            }
        }

        let exit = streams.exit.await.unwrap_or_else(|_| JobExit {
            code: -1,
            error: Some("job supervisor vanished".to_string()),
        });
        self.check_owner(&info);
        debug!(
            "Command SDK ID {} [Cmd ID {}] exited: code {}, error {:?}",
            info.sdk_id, info.cmd_id, exit.code, exit.error
        );

        let sink = self.sessions.sink(&info.session_id);
        if let Some(sink) = &sink {
            if !buffers.is_empty() {
                let (stdout, stderr) = buffers.take();
                let msg = SdkManagementMsg::output(
                    &info.cmd_id,
                    self.snapshot(),
                    PROGRESS_FINAL_FLUSH,
                    stdout,
                    stderr,
                );
                self.emit(sink.as_ref(), &info, &msg);
            }
        }

        let sdk = self.finish(&exit);
        match &sdk.status {
            SdkStatus::Installed => info!("SDK {} installed", sdk.name),
            _ => warn!("SDK {}: {}", sdk.name, sdk.last_error),
        }

        // The job is detached before its terminal event goes out
        self.job().take();

        match &sink {
            Some(sink) => {
                let error = exit.error.clone().unwrap_or_else(|| sdk.last_error.clone());
                let msg = SdkManagementMsg::exited(&info.cmd_id, sdk, exit.code, error);
                self.emit(sink.as_ref(), &info, &msg);
            }
            None => debug!(
                "{} (exit) not emitted: session {} closed (cmd {})",
                EVT_SDK_INSTALL, info.session_id, info.cmd_id
            ),
        }

        let _ = released.send(true);
    }
}

/// One managed SDK bound to its family scripts
#[derive(Clone)]
pub struct CrossSdk {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CrossSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossSdk").field("sdk", &*self.inner.sdk()).finish()
    }
}

impl CrossSdk {
    /// Validate a raw SDK record and bind it to its family
    pub fn new(sdk: Sdk, family: Arc<SdkFamily>, sessions: Arc<dyn SessionRegistry>) -> Result<Self> {
        Self::with_options(sdk, family, sessions, SdkOptions::default())
    }

    pub fn with_options(
        sdk: Sdk,
        family: Arc<SdkFamily>,
        sessions: Arc<dyn SessionRegistry>,
        options: SdkOptions,
    ) -> Result<Self> {
        let sdk = validate_sdk(sdk, &family.config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                sdk: RwLock::new(sdk),
                family,
                sessions,
                thresholds: options.thresholds,
                default_timeout: options.default_timeout,
                job: Mutex::new(None),
            }),
        })
    }

    pub fn id(&self) -> String {
        self.inner.sdk().id.clone()
    }

    pub fn family(&self) -> &SdkFamily {
        &self.inner.family
    }

    /// Snapshot of the SDK record; it does not follow later changes
    pub fn get(&self) -> Sdk {
        self.inner.snapshot()
    }

    /// True while an install job is attached
    pub fn is_busy(&self) -> bool {
        self.inner.job().is_some()
    }

    /// Command initialising a shell for this SDK
    pub fn env_command(&self) -> Vec<String> {
        vec!["source".to_string(), self.inner.sdk().setup_file.clone()]
    }

    /// Start installing the SDK in the background.
    ///
    /// Returns the command id used in the progress events once the `add`
    /// script is running. The outcome is only reported through the events
    /// and the SDK record.
    pub async fn install(&self, request: InstallRequest) -> Result<String> {
        let inner = &self.inner;
        let mut job = inner.job();

        let (args, sdk_id, name) = {
            let mut sdk = inner.sdk_mut();
            match sdk.status {
                SdkStatus::Installed => {
                    return Err(Error::AlreadyInstalled {
                        name: sdk.name.clone(),
                    })
                }
                SdkStatus::Installing | SdkStatus::Uninstalling => {
                    return Err(Error::InstallInProgress {
                        name: sdk.name.clone(),
                    })
                }
                SdkStatus::NotInstalled if job.is_some() => {
                    return Err(Error::InstallInProgress {
                        name: sdk.name.clone(),
                    })
                }
                SdkStatus::NotInstalled => {}
            }

            let mut args = match &request.source {
                InstallSource::File(file) => vec!["--file".to_string(), file.clone()],
                InstallSource::Url(url) => vec!["--url".to_string(), url.clone()],
                InstallSource::Catalog if sdk.url.is_empty() => {
                    return Err(Error::invalid_definition("url not set"))
                }
                InstallSource::Catalog => vec!["--url".to_string(), sdk.url.clone()],
            };
            if request.force {
                args.push("--force".to_string());
            }

            sdk.status = SdkStatus::Installing;
            sdk.last_error.clear();
            (args, sdk.id.clone(), sdk.name.clone())
        };

        let spec = JobSpec {
            cmd_id: job::next_command_id("sdk-install"),
            script: inner.family.scripts.path(ScriptRole::Add),
            args,
            timeout: request.timeout.unwrap_or(inner.default_timeout),
            session_id: request.session_id,
            sdk_id,
        };
        let thresholds = inner.thresholds.with_env_overrides();

        info!(
            "Install SDK {}: cmdID={}, cmd={}, args={:?}",
            name,
            spec.cmd_id,
            spec.script.display(),
            spec.args
        );

        let (handle, streams) = match job::start(spec) {
            Ok(started) => started,
            Err(e) => {
                let mut sdk = inner.sdk_mut();
                sdk.status = SdkStatus::NotInstalled;
                sdk.last_error = e.to_string();
                return Err(e);
            }
        };

        let cmd_id = handle.info().cmd_id.clone();
        let (released_tx, released_rx) = watch::channel(false);
        *job = Some(ActiveJob {
            handle,
            released: released_rx,
        });
        drop(job);

        tokio::spawn(Arc::clone(inner).stream_job(streams, thresholds, released_tx));
        Ok(cmd_id)
    }

    /// Kill the running install job.
    ///
    /// The job's exit is still processed normally and produces the terminal
    /// event. With a timeout, waits that long for the job to be detached.
    pub async fn abort_install_remove(&self, timeout: Option<Duration>) -> Result<()> {
        let mut released = {
            let job = self.inner.job();
            let Some(active) = job.as_ref() else {
                return Err(Error::NoOperationInProgress {
                    name: self.inner.sdk().name.clone(),
                });
            };

            self.inner.sdk_mut().status = SdkStatus::NotInstalled;
            info!("Aborting command {}", active.handle.info().cmd_id);
            active.handle.kill();
            active.released.clone()
        };

        if let Some(timeout) = timeout {
            if tokio::time::timeout(timeout, released.wait_for(|done| *done))
                .await
                .is_err()
            {
                warn!("Aborted job still running after {:?}", timeout);
            }
        }
        Ok(())
    }

    /// Uninstall the SDK, waiting for the `remove` script to finish
    pub async fn remove(&self) -> Result<()> {
        let (path, name) = {
            let mut sdk = self.inner.sdk_mut();
            if sdk.status != SdkStatus::Installed {
                return Err(Error::NotInstalled {
                    name: sdk.name.clone(),
                });
            }
            if sdk.path.is_empty() {
                return Err(Error::invalid_definition("path not set"));
            }
            sdk.status = SdkStatus::Uninstalling;
            (sdk.path.clone(), sdk.name.clone())
        };

        let script = self.inner.family.scripts.path(ScriptRole::Remove);
        info!("Removing SDK {} from {}", name, path);

        let failure = match run_script(&script, &[path.as_str()]).await {
            Ok(output) if output.status.success() => {
                debug!(
                    "SDK uninstall output: {}",
                    one_line(&String::from_utf8_lossy(&output.stdout))
                );
                None
            }
            Ok(output) => Some(format!(
                "{} exited with {}: {}",
                script_name(&script),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )),
            Err(e) => Some(e.to_string()),
        };

        let mut sdk = self.inner.sdk_mut();
        match failure {
            None => {
                sdk.status = SdkStatus::NotInstalled;
                sdk.last_error.clear();
                info!("SDK {} removed", name);
                Ok(())
            }
            Some(message) => {
                sdk.status = SdkStatus::Installed;
                sdk.last_error = format!("Removal failed: {}", message);
                Err(Error::RemoveFailed { name, message })
            }
        }
    }
}

fn script_name(script: &Path) -> String {
    script
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| script.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_buffers_flush_on_threshold() {
        let thresholds = BufferThresholds {
            stdout: 4,
            stderr: 8,
        };
        let mut buffers = OutputBuffers::default();

        buffers.push(JobOutput {
            stdout: "abcd".to_string(),
            ..Default::default()
        });
        assert!(!buffers.exceeds(&thresholds));

        buffers.push(JobOutput {
            stdout: "e".to_string(),
            ..Default::default()
        });
        assert!(buffers.exceeds(&thresholds));

        let (stdout, stderr) = buffers.take();
        assert_eq!(stdout, "abcde");
        assert!(stderr.is_empty());
        assert!(buffers.is_empty());
    }

    #[test]
    fn test_stderr_threshold_is_independent() {
        let thresholds = BufferThresholds::default();
        let mut buffers = OutputBuffers::default();
        buffers.push(JobOutput {
            stderr: "x".repeat(2000),
            ..Default::default()
        });
        assert!(!buffers.exceeds(&thresholds));
        buffers.push(JobOutput {
            stderr: "y".to_string(),
            ..Default::default()
        });
        assert!(buffers.exceeds(&thresholds));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(ENV_BUF_STDOUT, "100");
        std::env::set_var(ENV_BUF_STDERR, "lots");
        let thresholds = BufferThresholds::default().with_env_overrides();
        std::env::remove_var(ENV_BUF_STDOUT);
        std::env::remove_var(ENV_BUF_STDERR);

        assert_eq!(thresholds.stdout, 100);
        assert_eq!(thresholds.stderr, DEFAULT_STDERR_THRESHOLD);
    }

    #[test]
    fn test_install_request_builder() {
        let request = InstallRequest::new("sess")
            .with_file("/tmp/sdk.sh")
            .force(true)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(request.source, InstallSource::File("/tmp/sdk.sh".to_string()));
        assert!(request.force);
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }
}
