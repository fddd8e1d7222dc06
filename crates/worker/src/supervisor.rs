//! Lifecycle supervision for long-lived auxiliary units.
//!
//! The request path invokes its units per request and settles them
//! immediately. The assistant service is different: it has to stay up
//! next to the backend for its whole lifetime. [`Supervisor`] owns that
//! lifecycle as an explicit object the host passes around: start it,
//! ask whether the service is up, stop it on shutdown.
//!
//! When the supervised unit exits uncleanly it is restarted after a
//! backoff delay that doubles on every consecutive crash and resets
//! once the unit has stayed up long enough to be considered stable. A
//! clean exit is treated as the unit finishing its job; supervision
//! ends without a restart.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::CommandSpec;

/// Delay before the first restart after a crash.
const RESTART_BASE_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on the crash-restart delay.
const RESTART_MAX_DELAY: Duration = Duration::from_secs(60);

/// Uptime after which a unit counts as stable and the backoff resets.
const STABLE_UPTIME: Duration = Duration::from_secs(30);

/// Keeps one long-lived computation unit alive.
///
/// ## Example
///
/// ```ignore
/// let mut supervisor = Supervisor::new(
///     CommandSpec::new("python3").arg("scripts/assistant_service.py"),
/// );
/// supervisor.start();
/// // ... serve requests ...
/// supervisor.stop().await;
/// ```
pub struct Supervisor {
    command: CommandSpec,
    base_delay: Duration,
    max_delay: Duration,
    running: Arc<AtomicBool>,
    shutdown: Option<watch::Sender<bool>>,
    monitor: Option<JoinHandle<()>>,
}

impl Supervisor {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            base_delay: RESTART_BASE_DELAY,
            max_delay: RESTART_MAX_DELAY,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            monitor: None,
        }
    }

    /// Override the restart backoff window (builder style).
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    /// Launch the unit and begin monitoring it.
    ///
    /// Calling `start` while a monitor is already active is a no-op, so
    /// the host cannot accidentally run two copies of the service.
    pub fn start(&mut self) {
        let already_active = self
            .monitor
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if already_active {
            info!(program = %self.command.program, "supervisor already active, ignoring start");
            return;
        }

        let (tx, rx) = watch::channel(false);
        self.shutdown = Some(tx);
        self.monitor = Some(tokio::spawn(monitor_loop(
            self.command.clone(),
            self.base_delay,
            self.max_delay,
            Arc::clone(&self.running),
            rx,
        )));
        info!(program = %self.command.program, "supervisor started");
    }

    /// Stop the unit and end supervision.
    ///
    /// The current process (if any) is killed and reaped; no restart is
    /// scheduled. Safe to call when nothing is running.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.monitor.take() {
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
        info!(program = %self.command.program, "supervisor stopped");
    }

    /// True while the supervised unit has a live process.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

async fn monitor_loop(
    command: CommandSpec,
    base_delay: Duration,
    max_delay: Duration,
    running: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut delay = base_delay;

    loop {
        let launched_at = Instant::now();
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.base_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(program = %command.program, error = %e, "failed to launch supervised unit");
                // Treat a failed launch like a crash: back off and retry.
                tokio::select! {
                    _ = sleep(delay) => {
                        delay = (delay * 2).min(max_delay);
                        continue;
                    }
                    _ = shutdown.changed() => return,
                }
            }
        };
        running.store(true, Ordering::SeqCst);
        info!(program = %command.program, "supervised unit launched");

        tokio::select! {
            status = child.wait() => {
                running.store(false, Ordering::SeqCst);
                let clean = matches!(&status, Ok(s) if s.success());
                if clean {
                    info!(program = %command.program, "supervised unit exited cleanly, not restarting");
                    return;
                }
                if launched_at.elapsed() >= STABLE_UPTIME {
                    delay = base_delay;
                }
                warn!(
                    program = %command.program,
                    status = ?status,
                    retry_in_ms = delay.as_millis() as u64,
                    "supervised unit exited uncleanly, scheduling restart"
                );
                tokio::select! {
                    _ = sleep(delay) => {
                        delay = (delay * 2).min(max_delay);
                    }
                    _ = shutdown.changed() => return,
                }
            }
            _ = shutdown.changed() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                running.store(false, Ordering::SeqCst);
                return;
            }
        }
    }
}
