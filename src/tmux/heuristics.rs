use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What an agent in a tmux window appears to be doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AgentStatus {
    /// Generating or running a tool
    Busy,
    /// Back at its prompt
    Idle,
    /// Blocked on an approval or question
    WaitingForInput,
    /// Printed an error or crashed
    Error,
    #[default]
    Unknown,
}

/// Lines from the bottom of the pane that are considered.
const TAIL_LINES: usize = 20;

static RE_WAITING_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(Do you want to (proceed|make this edit|run)|Allow (once|always)|Approve\?|waiting for (user )?approval|\[y/n\]|\(y/N\)|\(Y/n\)|Press Enter to continue)").unwrap()
});

static RE_BUSY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(esc to (interrupt|cancel)|Thinking|Working \(|Generating|⠋|⠙|⠹|⠸|⠼|⠴|⠦|⠧|⠇|⠏|✻|✽)").unwrap()
});

static RE_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(^\s*Error:|API Error|panicked at|command not found|Traceback \(most recent call last\))").unwrap()
});

static RE_IDLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(^[│|]?\s*>\s*$|^\s*❯\s*$|^\$\s*$|Type your message|\? for shortcuts)").unwrap()
});

/// Classifies captured pane text into an [`AgentStatus`]
pub struct StatusInference;

impl StatusInference {
    pub fn from_pane(content: &str) -> AgentStatus {
        // tmux pads captures to the pane height with blank lines
        let lines: Vec<&str> = content
            .trim_end()
            .lines()
            .rev()
            .take(TAIL_LINES)
            .collect();
        let tail = lines.into_iter().rev().collect::<Vec<_>>().join("\n");

        if tail.trim().is_empty() {
            return AgentStatus::Unknown;
        }

        // Error > WaitingForInput > Busy > Idle
        if RE_ERROR.is_match(&tail) {
            return AgentStatus::Error;
        }
        if RE_WAITING_INPUT.is_match(&tail) {
            return AgentStatus::WaitingForInput;
        }
        if RE_BUSY.is_match(&tail) {
            return AgentStatus::Busy;
        }
        if RE_IDLE.is_match(&tail) {
            return AgentStatus::Idle;
        }

        AgentStatus::Unknown
    }
}
