//! Per-agent hook adapters.
//!
//! Each supported agent CLI has its own hook payload shape, its own way of
//! handing that payload to a script, and its own config file. An
//! [`AgentAdapter`] hides those differences behind one interface; the
//! [`AgentRegistry`] maps an agent name to its adapter.

mod claude;
mod codex;
mod gemini;
mod registry;
mod script;

pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use gemini::GeminiAdapter;
pub use registry::{registry, AgentRegistry};
pub use script::{HookInput, HookScript};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Raw hook payload as posted by an agent. Only adapters interpret it.
pub type HookData = serde_json::Map<String, Value>;

/// Appended to any body cut short for the destination channel.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Static description of a supported agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Registry key
    pub name: String,
    pub display_name: String,
    /// Command typed into the agent's tmux window
    pub command: String,
    /// Last path segment of the hook URL
    pub hook_endpoint: String,
    /// Naming hint for the destination channel
    pub channel_suffix: String,
}

impl AgentConfig {
    /// Config where every identifier is the agent's name.
    pub fn simple(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            command: name.to_string(),
            hook_endpoint: name.to_string(),
            channel_suffix: name.to_string(),
        }
    }
}

/// The contract every agent kind implements.
///
/// `format_hook_output` must be total: missing or oddly-typed fields fall
/// back to defaults instead of failing.
pub trait AgentAdapter: Send + Sync {
    fn config(&self) -> &AgentConfig;

    fn name(&self) -> &str {
        &self.config().name
    }

    /// Render a hook payload as channel-ready text.
    fn format_hook_output(&self, data: &HookData) -> String;

    /// Shell script the agent's hook mechanism should invoke.
    fn hook_script(&self, bridge_port: u16) -> String;

    /// Agent config file the hook must be registered in (`~`-relative).
    fn hook_install_path(&self) -> &'static str;

    /// Config fragment registering `script_path`, as structured data.
    fn settings_config(&self, script_path: &str) -> Value;

    /// The same fragment in the agent's native config syntax, when that is
    /// not JSON.
    fn native_config(&self, _script_path: &str) -> Option<String> {
        None
    }
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

/// JavaScript-style truthiness, which is how agents' optional fields behave.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text of a value: strings verbatim, anything else pretty-printed JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// First truthy field among `keys`, as text.
pub(crate) fn text_field(data: &HookData, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .find(|value| is_truthy(value))
        .map(value_text)
}

/// The whole payload as pretty JSON.
pub(crate) fn payload_text(data: &HookData) -> String {
    value_text(&Value::Object(data.clone()))
}

/// Cut `text` to at most `max` characters, marking the cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Header line followed by a fenced body.
pub(crate) fn fenced(header: &str, body: &str) -> String {
    format!("{header}\n```\n{body}\n```")
}
