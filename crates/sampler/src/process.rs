use crate::parser::parse_line;
use chrono::Local;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tegra_config::SamplerConfig;
use tegra_core::{Device, Reading, Result, SamplerState, Snapshot, StopReason, TegraError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Supervisor for a tegrastats subprocess.
///
/// [`open`](Self::open) launches the utility and spawns a background task that
/// parses each output line into the latest-reading [`Snapshot`]. Readers call
/// [`get`](Self::get) or [`snapshot`](Self::snapshot) at their own pace; bursts
/// faster than that are coalesced, only the last value per device is kept.
///
/// Dropping the sampler kills the subprocess, same as [`close`](Self::close).
pub struct SamplerProcess {
    config:   SamplerConfig,
    shared:   Arc<Shared>,
    shutdown: Option<oneshot::Sender<()>>,
    task:     Option<JoinHandle<()>>,
}

/// State written by the reader task and read by everyone else.
struct Shared {
    snapshot: watch::Sender<Snapshot>,
    state:    watch::Sender<SamplerState>,
}

impl Shared {
    fn ingest(&self, line: &str) {
        let mut parsed = parse_line(line);
        if parsed.is_empty() {
            trace!("no readings in line: {line}");
            return;
        }
        parsed.updated_at = Some(Local::now());
        // Each slot is swapped as a whole `Reading` under the channel lock.
        self.snapshot.send_modify(|snap| {
            snap.merge(&parsed);
        });
    }

    /// Move to `Stopped(reason)` unless already stopped.
    fn stop(&self, reason: StopReason) {
        self.state.send_if_modified(|state| {
            if state.is_stopped() {
                return false;
            }
            info!("tegrastats sampler {reason}");
            *state = SamplerState::Stopped(reason);
            true
        });
    }
}

impl SamplerProcess {
    pub fn new(config: SamplerConfig) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        let (state, _) = watch::channel(SamplerState::NotStarted);
        Self {
            config,
            shared: Arc::new(Shared { snapshot, state }),
            shutdown: None,
            task: None,
        }
    }

    /// Launch the utility and start the background reader.
    ///
    /// A spawn failure leaves the sampler in `NotStarted`, so `open` may be
    /// retried. Must be called from within a Tokio runtime.
    pub fn open(&mut self) -> Result<()> {
        if !matches!(*self.shared.state.borrow(), SamplerState::NotStarted) {
            return Err(TegraError::AlreadyStarted);
        }

        let path = &self.config.path;
        let mut child = Command::new(path)
            .args(&self.config.args)
            .arg("--interval")
            .arg(self.config.interval_ms.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TegraError::Spawn {
                path:    path.display().to_string(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or(TegraError::NoStdout)?;
        let pid = child.id();
        info!(
            "Started '{}' (pid {:?}, interval {} ms)",
            path.display(),
            pid,
            self.config.interval_ms
        );

        self.shared.state.send_replace(SamplerState::Running { pid });

        let (tx, rx) = oneshot::channel();
        self.shutdown = Some(tx);
        self.task = Some(tokio::spawn(read_loop(
            child,
            stdout,
            Arc::clone(&self.shared),
            rx,
        )));

        Ok(())
    }

    /// Kill the subprocess.
    ///
    /// Fails with [`TegraError::NotRunning`] if the sampler was never opened or
    /// was already closed. After the utility exited on its own, `close` still
    /// succeeds and the recorded exit reason is kept.
    pub fn close(&mut self) -> Result<()> {
        let Some(shutdown) = self.shutdown.take() else {
            return Err(TegraError::NotRunning);
        };
        // The receiver is gone if the reader already finished.
        let _ = shutdown.send(());
        self.shared.stop(StopReason::Closed);
        Ok(())
    }

    /// Latest reading for one device, `None` until that device has reported.
    pub fn get(&self, device: Device) -> Option<Reading> {
        self.shared.snapshot.borrow().get(device)
    }

    /// Latest readings for all devices.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn state(&self) -> SamplerState {
        self.shared.state.borrow().clone()
    }

    /// Change-notifying view of the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SamplerState> {
        self.shared.state.subscribe()
    }

    /// Wait for the first snapshot in which every device has a reading.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<Snapshot> {
        let mut snapshots = self.subscribe();
        let mut states = self.subscribe_state();

        let ready = async {
            loop {
                let snap = snapshots.borrow_and_update().clone();
                if snap.is_complete() {
                    return Ok(snap);
                }

                let state = states.borrow_and_update().clone();
                match state {
                    SamplerState::NotStarted => return Err(TegraError::NotRunning),
                    SamplerState::Stopped(_) => {
                        // The last line may have landed between the two borrows.
                        let snap = snapshots.borrow().clone();
                        return if snap.is_complete() {
                            Ok(snap)
                        } else {
                            Err(TegraError::StoppedBeforeReady)
                        };
                    }
                    SamplerState::Running { .. } => {}
                }

                tokio::select! {
                    _ = snapshots.changed() => {}
                    _ = states.changed() => {}
                }
            }
        };

        tokio::time::timeout(timeout, ready)
            .await
            .map_err(|_| TegraError::StartupTimeout(timeout.as_millis() as u64))?
    }

    /// Resolve once the sampler has stopped, for whatever reason.
    ///
    /// Never resolves on a sampler that was not opened.
    pub async fn stopped(&self) -> StopReason {
        let mut states = self.subscribe_state();
        loop {
            let state = states.borrow_and_update().clone();
            if let SamplerState::Stopped(reason) = state {
                return reason;
            }
            if states.changed().await.is_err() {
                return StopReason::Closed;
            }
        }
    }

    /// Wait for the background reader to finish after the sampler stopped.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("tegrastats reader task failed: {e}");
            }
        }
    }
}

async fn read_loop(
    mut child: Child,
    stdout: ChildStdout,
    shared: Arc<Shared>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut lines = BufReader::new(stdout).lines();

    let reason = loop {
        tokio::select! {
            biased;

            // Fires on `close()` and also when the sampler is dropped.
            _ = &mut shutdown => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill tegrastats: {e}");
                }
                break StopReason::Closed;
            }
            next = lines.next_line() => match next {
                Ok(Some(line)) => shared.ingest(&line),
                Ok(None) => {
                    debug!("tegrastats closed its output");
                    let code = tokio::select! {
                        status = child.wait() => match status {
                            Ok(status) => status.code(),
                            Err(e) => {
                                warn!("Cannot collect tegrastats exit status: {e}");
                                None
                            }
                        },
                        _ = &mut shutdown => {
                            let _ = child.kill().await;
                            None
                        }
                    };
                    break StopReason::Exited { code };
                }
                Err(e) => {
                    let err = if e.kind() == io::ErrorKind::InvalidData {
                        TegraError::Decode
                    } else {
                        TegraError::Read(e.to_string())
                    };
                    warn!("tegrastats reader stopped: {err}");
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill tegrastats: {e}");
                    }
                    break StopReason::Failed(err);
                }
            }
        }
    };

    shared.stop(reason);
}
