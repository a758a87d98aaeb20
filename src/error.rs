use std::path::PathBuf;

use thiserror::Error;

/// Stderr fragments tmux prints when there is simply nothing to talk to.
const ABSENCE_MARKERS: &[&str] = &[
    "no server running",
    "no sessions",
    "can't find session",
    "session not found",
    "can't find window",
    "command not found",
    "No such file or directory",
    "error connecting to",
];

/// A shell command that could not be run or exited non-zero.
#[derive(Debug, Clone, Error)]
#[error("`{command}` failed: {message}")]
pub struct CommandError {
    pub command: String,
    pub message: String,
}

impl CommandError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }

    /// True when the failure means "nothing there" (no server, no session,
    /// no tmux binary) rather than an operational fault.
    pub fn is_absence(&self) -> bool {
        ABSENCE_MARKERS.iter().any(|m| self.message.contains(m))
    }
}

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("Failed to create tmux session '{session}': {source}")]
    CreateSession {
        session: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to kill tmux session '{session}': {source}")]
    KillSession {
        session: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to create window '{window}' in session '{session}': {source}")]
    CreateWindow {
        session: String,
        window: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to list sessions: {source}")]
    ListSessions {
        #[source]
        source: CommandError,
    },

    #[error("Failed to list windows in session '{session}': {source}")]
    ListWindows {
        session: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to send keys to window '{window}' in session '{session}': {source}")]
    SendKeys {
        session: String,
        window: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to capture pane from window '{window}' in session '{session}': {source}")]
    CapturePane {
        session: String,
        window: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to set env {key} on session '{session}': {source}")]
    SetEnv {
        session: String,
        key: String,
        #[source]
        source: CommandError,
    },
}

impl TmuxError {
    /// The underlying command failure.
    pub fn command_error(&self) -> &CommandError {
        match self {
            TmuxError::CreateSession { source, .. }
            | TmuxError::KillSession { source, .. }
            | TmuxError::CreateWindow { source, .. }
            | TmuxError::ListSessions { source }
            | TmuxError::ListWindows { source, .. }
            | TmuxError::SendKeys { source, .. }
            | TmuxError::CapturePane { source, .. }
            | TmuxError::SetEnv { source, .. } => source,
        }
    }

    /// Window creation lost a race against another creator of the same window.
    pub fn is_duplicate_window(&self) -> bool {
        self.command_error().message.contains("duplicate window")
    }

    /// Session creation lost a race against another creator of the same session.
    pub fn is_duplicate_session(&self) -> bool {
        self.command_error().message.contains("duplicate session")
    }
}

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Failed to create state directory {path}: {source}")]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn daemon {entry_point}: {source}")]
    Spawn {
        entry_point: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown agent '{0}': no adapter registered under that name")]
    UnknownAgent(String),

    #[error("An adapter named '{0}' is already registered")]
    DuplicateAgent(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Hook payload for '{agent}' is not a JSON object")]
    NotAnObject { agent: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port in {var}: '{value}'")]
    InvalidPort { var: &'static str, value: String },

    #[error("Could not determine home directory for the state directory")]
    NoHomeDir,
}
