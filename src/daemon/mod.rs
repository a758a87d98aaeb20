//! Supervision of the detached forwarding daemon.
//!
//! The daemon is tracked by a single pid file in the state directory; its
//! stdout and stderr are appended to one shared log file. Liveness is checked
//! over TCP, so "running" means "something accepts connections on the port".

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::DaemonError;

pub const PID_FILE_NAME: &str = "bridge.pid";
pub const LOG_FILE_NAME: &str = "bridge.log";

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(5000);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

pub struct DaemonManager {
    state_dir: PathBuf,
}

impl DaemonManager {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.state_dir)
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn pid_file(&self) -> PathBuf {
        self.state_dir.join(PID_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join(LOG_FILE_NAME)
    }

    /// Whether something accepts TCP connections on loopback `port`.
    pub async fn is_running(port: u16) -> bool {
        matches!(
            timeout(CONNECT_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await,
            Ok(Ok(_))
        )
    }

    /// Poll [`is_running`](Self::is_running) until it succeeds or `limit` elapses.
    pub async fn wait_for_ready(port: u16, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            if Self::is_running(port).await {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(port, "daemon did not become ready in time");
                return false;
            }
            sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Spawn `entry_point` detached, logging to the shared log file, and
    /// record its pid. The child is never waited on.
    pub fn start_daemon(&self, entry_point: &Path, args: &[String]) -> Result<u32, DaemonError> {
        fs::create_dir_all(&self.state_dir).map_err(|source| DaemonError::StateDir {
            path: self.state_dir.clone(),
            source,
        })?;

        let log_path = self.log_file();
        let log_error = |source: std::io::Error| DaemonError::LogFile {
            path: log_path.clone(),
            source,
        };
        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(log_error)?;
        let stderr = stdout.try_clone().map_err(log_error)?;

        let mut command = Command::new(entry_point);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // Own process group so the daemon outlives the launching terminal
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|source| DaemonError::Spawn {
            entry_point: entry_point.to_path_buf(),
            source,
        })?;
        let pid = child.id();
        drop(child);

        let pid_path = self.pid_file();
        fs::write(&pid_path, pid.to_string()).map_err(|source| DaemonError::PidFile {
            path: pid_path.clone(),
            source,
        })?;

        info!(pid, entry_point = %entry_point.display(), log = %log_path.display(), "started daemon");
        Ok(pid)
    }

    /// Pid recorded in the pid file, if any
    pub fn tracked_pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// SIGTERM the tracked daemon and forget it.
    ///
    /// Returns `false` when nothing is tracked or the signal could not be
    /// delivered. The pid file is removed in every case where it existed.
    pub fn stop_daemon(&self) -> bool {
        let pid_path = self.pid_file();

        let raw = match fs::read_to_string(&pid_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no daemon tracked");
                return false;
            }
            Err(e) => {
                warn!(path = %pid_path.display(), error = %e, "unreadable pid file");
                remove_pid_file(&pid_path);
                return false;
            }
        };

        let signalled = match raw.trim().parse::<u32>() {
            Ok(pid) => {
                let delivered = terminate(pid);
                if delivered {
                    info!(pid, "sent SIGTERM to daemon");
                } else {
                    warn!(pid, "daemon process already gone, removing stale pid file");
                }
                delivered
            }
            Err(_) => {
                warn!(contents = %raw.trim(), "pid file does not contain a pid");
                false
            }
        };

        remove_pid_file(&pid_path);
        signalled
    }
}

fn remove_pid_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove pid file"),
    }
}

/// Send SIGTERM. Refuses pids that would address a process group.
fn terminate(pid: u32) -> bool {
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }

    #[cfg(unix)]
    {
        // SAFETY: kill(2) has no memory-safety preconditions; pid is a
        // positive value so only that single process is addressed.
        unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}
