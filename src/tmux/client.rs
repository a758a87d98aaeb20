use std::sync::Arc;
use tracing::{debug, info};

use super::executor::{shell_escape, CommandExecutor, ShellExecutor};
use super::heuristics::{AgentStatus, StatusInference};
use super::{TmuxSession, SESSION_FORMAT};
use crate::error::{CommandError, TmuxError};

/// Manages one tmux session per project and one window per agent inside it.
///
/// Session names are always `prefix + project`. All state lives in tmux;
/// nothing is cached here, so concurrent actors are reconciled by tmux itself.
pub struct TmuxManager<E: CommandExecutor = ShellExecutor> {
    executor: Arc<E>,
    session_prefix: String,
}

impl TmuxManager<ShellExecutor> {
    pub fn new(session_prefix: impl Into<String>) -> Self {
        Self::with_executor(Arc::new(ShellExecutor::new()), session_prefix)
    }
}

impl<E: CommandExecutor> TmuxManager<E> {
    pub fn with_executor(executor: Arc<E>, session_prefix: impl Into<String>) -> Self {
        Self {
            executor,
            session_prefix: session_prefix.into(),
        }
    }

    pub fn session_prefix(&self) -> &str {
        &self.session_prefix
    }

    /// Full tmux session name for a project
    pub fn session_name(&self, project: &str) -> String {
        format!("{}{}", self.session_prefix, project)
    }

    /// Check whether the project's session exists.
    ///
    /// Any failure (tmux missing, no server, no such session) reads as `false`.
    pub async fn session_exists(&self, project: &str) -> bool {
        let session = self.session_name(project);
        let cmd = format!("tmux has-session -t {}", session_target(&session));
        match self.executor.exec(&cmd).await {
            Ok(_) => true,
            Err(e) => {
                debug!(session = %session, error = %e.message, "session check failed");
                false
            }
        }
    }

    /// Return the project's session name, creating the session if needed.
    pub async fn get_or_create_session(&self, project: &str) -> Result<String, TmuxError> {
        let session = self.session_name(project);

        if self.session_exists(project).await {
            return Ok(session);
        }

        let cmd = format!("tmux new-session -d -s {}", shell_escape(&session));
        match self.executor.exec(&cmd).await {
            Ok(_) => {
                info!(session = %session, "created tmux session");
                Ok(session)
            }
            Err(source) => {
                let err = TmuxError::CreateSession {
                    session: session.clone(),
                    source,
                };
                // Someone else created it between our check and our create
                if err.is_duplicate_session() && self.session_exists(project).await {
                    debug!(session = %session, "session created concurrently");
                    return Ok(session);
                }
                Err(err)
            }
        }
    }

    /// Kill the project's session. A session that is already gone is not an error.
    pub async fn kill_session(&self, project: &str) -> Result<(), TmuxError> {
        let session = self.session_name(project);
        let cmd = format!("tmux kill-session -t {}", session_target(&session));
        match self.executor.exec(&cmd).await {
            Ok(_) => {
                info!(session = %session, "killed tmux session");
                Ok(())
            }
            Err(source) if source.is_absence() => {
                debug!(session = %session, "session already gone");
                Ok(())
            }
            Err(source) => Err(TmuxError::KillSession { session, source }),
        }
    }

    /// Create a named window in a session (full session name).
    ///
    /// Losing a race to create the same window is tolerated.
    pub async fn create_window(&self, session: &str, window: &str) -> Result<(), TmuxError> {
        let cmd = format!(
            "tmux new-window -t {} -n {}",
            shell_escape(&format!("={session}:")),
            shell_escape(window)
        );

        match self.executor.exec(&cmd).await {
            Ok(_) => Ok(()),
            Err(source) => {
                let err = TmuxError::CreateWindow {
                    session: session.to_string(),
                    window: window.to_string(),
                    source,
                };
                if err.is_duplicate_window() {
                    debug!(session, window, "window already exists");
                    return Ok(());
                }
                Err(err)
            }
        }
    }

    /// Window names in a session. A missing session yields an empty list.
    pub async fn list_windows(&self, session: &str) -> Result<Vec<String>, TmuxError> {
        let cmd = format!(
            "tmux list-windows -t {} -F {}",
            session_target(session),
            shell_escape("#{window_name}")
        );

        match self.executor.exec(&cmd).await {
            Ok(stdout) => Ok(stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()),
            Err(source) if source.is_absence() => Ok(Vec::new()),
            Err(source) => Err(TmuxError::ListWindows {
                session: session.to_string(),
                source,
            }),
        }
    }

    /// Type `text` into a window, then press Enter as a separate call.
    pub async fn send_keys_to_window(
        &self,
        session: &str,
        window: &str,
        text: &str,
    ) -> Result<(), TmuxError> {
        let target = window_target(session, window);
        let wrap = |source: CommandError| TmuxError::SendKeys {
            session: session.to_string(),
            window: window.to_string(),
            source,
        };

        // Text and Enter in one send-keys call is unreliable with some tmux builds
        self.executor
            .exec(&format!("tmux send-keys -t {target} -l {}", shell_escape(text)))
            .await
            .map_err(wrap)?;
        self.executor
            .exec(&format!("tmux send-keys -t {target} Enter"))
            .await
            .map_err(wrap)?;

        Ok(())
    }

    /// Visible contents of a window's pane. A missing window yields an empty string.
    pub async fn capture_pane_from_window(
        &self,
        session: &str,
        window: &str,
    ) -> Result<String, TmuxError> {
        let target = window_target(session, window);
        match self
            .executor
            .exec(&format!("tmux capture-pane -t {target} -p"))
            .await
        {
            Ok(stdout) => Ok(stdout),
            Err(source) if source.is_absence() => Ok(String::new()),
            Err(source) => Err(TmuxError::CapturePane {
                session: session.to_string(),
                window: window.to_string(),
                source,
            }),
        }
    }

    /// Infer what the agent in a window is doing from its pane contents
    pub async fn window_status(&self, session: &str, window: &str) -> Result<AgentStatus, TmuxError> {
        let content = self.capture_pane_from_window(session, window).await?;
        Ok(StatusInference::from_pane(&content))
    }

    /// Open (or reuse) the agent's window and type its launch command.
    pub async fn start_agent_in_window(
        &self,
        session: &str,
        window: &str,
        command: &str,
    ) -> Result<(), TmuxError> {
        self.create_window(session, window).await?;
        self.send_keys_to_window(session, window, command).await?;
        info!(session, window, command, "started agent");
        Ok(())
    }

    /// Set a session-scoped environment variable inherited by new windows.
    pub async fn set_session_env(&self, session: &str, key: &str, value: &str) -> Result<(), TmuxError> {
        let cmd = format!(
            "tmux set-environment -t {} {} {}",
            session_target(session),
            shell_escape(key),
            shell_escape(value)
        );
        self.executor
            .exec(&cmd)
            .await
            .map(|_| ())
            .map_err(|source| TmuxError::SetEnv {
                session: session.to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// Sessions owned by this manager (matching the prefix).
    ///
    /// An empty or absent tmux server yields an empty list.
    pub async fn list_sessions(&self) -> Result<Vec<TmuxSession>, TmuxError> {
        let cmd = format!("tmux list-sessions -F {}", shell_escape(SESSION_FORMAT));

        let stdout = match self.executor.exec(&cmd).await {
            Ok(stdout) => stdout,
            Err(source) if source.is_absence() => return Ok(Vec::new()),
            Err(source) => return Err(TmuxError::ListSessions { source }),
        };

        Ok(stdout
            .lines()
            .filter_map(TmuxSession::parse_line)
            .filter(|s| s.name.starts_with(&self.session_prefix))
            .collect())
    }
}

/// Exact-match session target. A bare name would also match any session it
/// is a prefix of, e.g. `agent-api` hitting `agent-api2`.
fn session_target(session: &str) -> String {
    shell_escape(&format!("={session}"))
}

/// Exact-match `session:window` target.
fn window_target(session: &str, window: &str) -> String {
    shell_escape(&format!("={session}:={window}"))
}
