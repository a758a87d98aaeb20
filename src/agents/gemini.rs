//! Gemini CLI. Hooks receive JSON on stdin and must answer with a status
//! object on stdout.

use serde_json::{json, Value};

use super::script::{HookInput, HookScript};
use super::{fenced, text_field, truncate, AgentAdapter, AgentConfig, HookData};

const OUTPUT_LIMIT: usize = 1800;

pub struct GeminiAdapter {
    config: AgentConfig,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::simple("gemini", "Gemini CLI"),
        }
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for GeminiAdapter {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn format_hook_output(&self, data: &HookData) -> String {
        if text_field(data, &["hook_event_name"]).as_deref() == Some("AfterAgent") {
            let response = text_field(data, &["prompt_response", "response"]).unwrap_or_default();
            return fenced(
                "💎 **Gemini Turn Complete**",
                &truncate(&response, OUTPUT_LIMIT),
            );
        }

        let tool = text_field(data, &["tool_name", "toolName", "function_name"])
            .unwrap_or_else(|| "unknown".to_string());
        let output = text_field(data, &["tool_response", "output", "result"]).unwrap_or_default();

        fenced(
            &format!("**Gemini** - 💎 {tool}"),
            &truncate(&output, OUTPUT_LIMIT),
        )
    }

    fn hook_script(&self, bridge_port: u16) -> String {
        HookScript {
            description: "Gemini CLI PostToolUse hook",
            endpoint: &self.config.hook_endpoint,
            input: HookInput::Stdin,
            response: Some(r#"{"status": "ok"}"#),
        }
        .render(bridge_port)
    }

    fn hook_install_path(&self) -> &'static str {
        "~/.gemini/settings.json"
    }

    fn settings_config(&self, script_path: &str) -> Value {
        json!({
            "hooks": {
                "post_tool_use": [
                    { "command": script_path }
                ]
            }
        })
    }
}
