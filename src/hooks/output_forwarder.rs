use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content used when a hook carries nothing to show.
const NO_OUTPUT: &str = "No output";

/// Hook event produced by the primary agent's tool-use plumbing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookContext {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    #[serde(default)]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    ToolOutput,
    AgentOutput,
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::ToolOutput => "tool-output",
            MessageType::AgentOutput => "agent-output",
            MessageType::Error => "error",
        };
        f.write_str(s)
    }
}

/// Normalized unit handed to the messaging side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

/// Turns primary-agent hook contexts into [`AgentMessage`]s and renders them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputForwarder;

impl OutputForwarder {
    pub fn new() -> Self {
        Self
    }

    pub fn process_hook_output(&self, context: &HookContext) -> AgentMessage {
        self.process_hook_output_at(context, Utc::now())
    }

    /// Same as [`process_hook_output`](Self::process_hook_output) with a fixed clock.
    pub fn process_hook_output_at(
        &self,
        context: &HookContext,
        timestamp: DateTime<Utc>,
    ) -> AgentMessage {
        AgentMessage {
            kind: MessageType::ToolOutput,
            content: extract_content(context),
            timestamp,
            session_name: None,
            agent_name: Some(context.tool_name.clone()).filter(|name| !name.is_empty()),
        }
    }

    /// Timestamp, type, optional agent, blank line, content.
    pub fn format_message(&self, message: &AgentMessage) -> String {
        let mut lines = vec![
            format!(
                "[{}]",
                message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            format!("Type: {}", message.kind),
        ];

        if let Some(agent) = message.agent_name.as_deref().filter(|a| !a.is_empty()) {
            lines.push(format!("Agent: {agent}"));
        }

        lines.push(String::new());
        lines.push(message.content.clone());

        lines.join("\n")
    }
}

/// Structured context beats raw output beats the placeholder.
fn extract_content(context: &HookContext) -> String {
    let additional = context
        .hook_specific_output
        .as_ref()
        .and_then(|h| h.additional_context.as_deref())
        .filter(|s| !s.is_empty());

    match additional {
        Some(text) => text.to_string(),
        None if !context.output.is_empty() => context.output.clone(),
        None => NO_OUTPUT.to_string(),
    }
}
