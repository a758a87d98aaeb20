mod client;
mod executor;
mod heuristics;

pub use client::TmuxManager;
pub use executor::{shell_escape, CommandExecutor, ShellExecutor};
pub use heuristics::{AgentStatus, StatusInference};

#[cfg(test)]
pub(crate) use executor::FakeExecutor;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// tmux format string matching [`TmuxSession::parse_line`]
pub(crate) const SESSION_FORMAT: &str =
    "#{session_name}|#{session_attached}|#{session_windows}|#{session_created}";

/// A tmux session as reported by `list-sessions`.
///
/// Rebuilt from tmux output on every query, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmuxSession {
    /// Full session name, prefix included
    pub name: String,
    /// Whether any client is attached
    pub attached: bool,
    /// Number of windows in the session
    pub windows: u32,
    /// When tmux created the session
    pub created: DateTime<Utc>,
}

impl TmuxSession {
    /// Parse one `SESSION_FORMAT` line. Fields are split from the right so
    /// a `|` inside the session name survives.
    pub(crate) fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.trim_end().rsplitn(4, '|');
        let created = parts.next()?;
        let windows = parts.next()?;
        let attached = parts.next()?;
        let name = parts.next()?;

        if name.is_empty() {
            return None;
        }

        let created = created
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_default();

        Some(Self {
            name: name.to_string(),
            attached: attached.parse::<u32>().map(|n| n > 0).unwrap_or(false),
            windows: windows.parse().unwrap_or(0),
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_line() {
        let session = TmuxSession::parse_line("agent-demo|1|3|1700000000").unwrap();
        assert_eq!(session.name, "agent-demo");
        assert!(session.attached);
        assert_eq!(session.windows, 3);
        assert_eq!(session.created.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_session_line_with_pipe_in_name() {
        let session = TmuxSession::parse_line("agent-a|b|0|1|42").unwrap();
        assert_eq!(session.name, "agent-a|b");
        assert!(!session.attached);
        assert_eq!(session.windows, 1);
    }

    #[test]
    fn test_parse_session_line_rejects_garbage() {
        assert!(TmuxSession::parse_line("").is_none());
        assert!(TmuxSession::parse_line("just-a-name").is_none());
        assert!(TmuxSession::parse_line("|0|1|42").is_none());
    }
}
