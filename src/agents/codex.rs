//! OpenAI Codex CLI. Codex runs its `notify` program with the event JSON as
//! the first argument and expects no reply.

use serde::Serialize;
use serde_json::{json, Value};

use super::script::{HookInput, HookScript};
use super::{fenced, payload_text, text_field, truncate, AgentAdapter, AgentConfig, HookData};

const TURN_PREVIEW_LIMIT: usize = 1800;
const OUTPUT_LIMIT: usize = 1900;

pub struct CodexAdapter {
    config: AgentConfig,
}

impl CodexAdapter {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::simple("codex", "Codex CLI"),
        }
    }
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct NotifyConfig<'a> {
    notify: Vec<&'a str>,
}

impl AgentAdapter for CodexAdapter {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn format_hook_output(&self, data: &HookData) -> String {
        let event = text_field(data, &["type"]).unwrap_or_else(|| "unknown".to_string());

        match event.as_str() {
            "agent-turn-complete" => {
                let last = text_field(data, &["last-assistant-message", "lastAssistantMessage"])
                    .unwrap_or_default();
                fenced(
                    "🤖 **Codex Turn Complete**",
                    &truncate(&last, TURN_PREVIEW_LIMIT),
                )
            }
            "approval-requested" => {
                "⚠️ **Codex Approval Requested**\nCodex is waiting for user approval.".to_string()
            }
            _ => {
                let output = text_field(data, &["output", "last-assistant-message"])
                    .unwrap_or_else(|| payload_text(data));
                fenced(
                    &format!("🤖 **{event}** (Codex)"),
                    &truncate(&output, OUTPUT_LIMIT),
                )
            }
        }
    }

    fn hook_script(&self, bridge_port: u16) -> String {
        HookScript {
            description: "Codex CLI notify hook",
            endpoint: &self.config.hook_endpoint,
            input: HookInput::FirstArg,
            response: None,
        }
        .render(bridge_port)
    }

    fn hook_install_path(&self) -> &'static str {
        "~/.codex/config.toml"
    }

    fn settings_config(&self, script_path: &str) -> Value {
        json!({
            "_format": "TOML",
            "_example": notify_line(script_path),
            "notify": [script_path],
        })
    }

    fn native_config(&self, script_path: &str) -> Option<String> {
        Some(format!(
            "# Discord Agent Bridge hook\n{}",
            notify_line(script_path)
        ))
    }
}

/// `notify = ["<path>"]`, quoted by the TOML serializer.
fn notify_line(script_path: &str) -> String {
    toml::to_string(&NotifyConfig {
        notify: vec![script_path],
    })
    .map(|s| s.trim_end().to_string())
    .unwrap_or_else(|_| format!("notify = [{script_path:?}]"))
}
