use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::event::{decode_line, Event, LogLevel};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Mutable job state, guarded by a single mutex since only one job runs
/// at a time.
///
/// `epoch` increments on every start; the pump task clears state only
/// while its own epoch is still current, so a pump outliving its job can
/// never clobber a successor's state.
#[derive(Debug, Default)]
struct JobState {
    running: bool,
    pid: Option<u32>,
    epoch: u64,
}

/// Supervises the automation worker process.
///
/// Owns the worker's lifecycle for the duration of one job: spawning,
/// line-oriented consumption of its stdout on a background task, typed
/// event fan-out to subscribers, and graceful-then-forced termination.
/// At most one job runs at a time.
pub struct Supervisor {
    config: Config,
    state: Arc<Mutex<JobState>>,
    events: broadcast::Sender<Event>,
    // Mirrors the running flag so stop() can await process exit
    active: watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (active, _) = watch::channel(false);
        Self {
            config,
            state: Arc::new(Mutex::new(JobState::default())),
            events,
            active,
        }
    }

    /// Subscribe to the event stream. Events for a job are delivered in
    /// the order its output lines were read; `Completion` is always last.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    /// Start a worker command. Returns immediately; output is consumed on
    /// a background task and surfaced through the event stream.
    ///
    /// Returns false without spawning when a job is already running, or
    /// when the worker cannot be spawned at all. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, command: &str, args: &[String]) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.running {
            let _ = self.events.send(Event::Log {
                level: LogLevel::Error,
                message: "Another command is already running".to_string(),
                timestamp: chrono::Local::now().to_rfc3339(),
            });
            return false;
        }

        let mut cmd = Command::new(&self.config.worker_executable);
        cmd.arg(&self.config.controller_path)
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let run_id = Uuid::new_v4().to_string();
        debug!("Starting worker job {}: {} {:?}", run_id, command, args);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let _ = self.events.send(Event::Completion {
                    success: false,
                    message: format!("Error running command: {e}"),
                });
                return false;
            }
        };

        // Stdout/stderr are piped above, so take() cannot fail
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();

        state.running = true;
        state.pid = child.id();
        state.epoch += 1;
        let epoch = state.epoch;
        drop(state);
        let _ = self.active.send_replace(true);

        tokio::spawn(pump(
            run_id,
            epoch,
            child,
            stdout,
            stderr,
            self.events.clone(),
            Arc::clone(&self.state),
            self.active.clone(),
        ));

        true
    }

    /// Stop the running job: request graceful termination, wait up to the
    /// configured grace period, then force-kill. Returns false when no job
    /// is running.
    pub async fn stop(&self) -> bool {
        let pid = {
            let state = self.state.lock().unwrap();
            if !state.running {
                return false;
            }
            state.pid
        };

        if let Some(pid) = pid {
            terminate(pid);

            let grace = Duration::from_secs(self.config.stop_grace_secs);
            let mut active = self.active.subscribe();
            if tokio::time::timeout(grace, active.wait_for(|a| !*a))
                .await
                .is_err()
            {
                warn!("Worker did not exit within {:?}, killing", grace);
                kill(pid);
                // The kill is unconditional, so the pump finishes promptly;
                // waiting for it keeps the stopped job's completion ahead
                // of any subsequent start
                let _ = active.wait_for(|a| !*a).await;
            }
        }

        self.state.lock().unwrap().running = false;
        let _ = self.events.send(Event::Log {
            level: LogLevel::Warn,
            message: "Process stopped by user".to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
        });
        true
    }
}

/// Background task that consumes one worker run: reads stdout line by
/// line, fans decoded events out, then reaps the process and emits the
/// terminal completion event.
async fn pump(
    run_id: String,
    epoch: u64,
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    events: broadcast::Sender<Event>,
    state: Arc<Mutex<JobState>>,
    active: watch::Sender<bool>,
) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // Prefer UTF-8, preserve bytes rather than fail on
                // whatever the worker writes
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(event) = decode_line(line) {
                    let _ = events.send(stamp_receipt_time(event));
                }
            }
            Err(e) => {
                warn!("Failed to read worker output for job {}: {}", run_id, e);
                break;
            }
        }
    }

    let completion = match child.wait().await {
        Ok(status) if status.success() => Event::Completion {
            success: true,
            message: "Command completed successfully".to_string(),
        },
        Ok(status) => {
            let mut diagnostics = Vec::new();
            let _ = BufReader::new(stderr).read_to_end(&mut diagnostics).await;
            let text = String::from_utf8_lossy(&diagnostics);
            debug!("Worker job {} exited with {:?}", run_id, status.code());
            Event::Completion {
                success: false,
                message: format!("Command failed: {}", text.trim()),
            }
        }
        Err(e) => Event::Completion {
            success: false,
            message: format!("Error waiting for worker: {e}"),
        },
    };

    let current = {
        let mut state = state.lock().unwrap();
        let current = state.epoch == epoch;
        if current {
            state.running = false;
            state.pid = None;
        }
        current
    };
    let _ = events.send(completion);
    // A superseded pump must not flip the successor's running state
    if current {
        let _ = active.send_replace(false);
    }
}

/// Fill in the receipt time on log events whose wire line carried no
/// usable timestamp
fn stamp_receipt_time(event: Event) -> Event {
    match event {
        Event::Log {
            level,
            message,
            timestamp,
        } => {
            let timestamp = if chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok() {
                timestamp
            } else {
                chrono::Local::now().to_rfc3339()
            };
            Event::Log {
                level,
                message,
                timestamp,
            }
        }
        other => other,
    }
}

#[cfg(unix)]
fn terminate(pid: u32) {
    use nix::sys::signal::{kill as send_signal, Signal};
    use nix::unistd::Pid;
    let _ = send_signal(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(unix)]
fn kill(pid: u32) {
    use nix::sys::signal::{kill as send_signal, Signal};
    use nix::unistd::Pid;
    let _ = send_signal(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn terminate(_pid: u32) {
    // No portable graceful-termination signal; the grace period elapses
    // and the force-kill path takes over
}

#[cfg(not(unix))]
fn kill(pid: u32) {
    warn!("Force-kill by pid is not supported on this platform (pid {pid})");
}
