//! Claude Code, the primary agent. Hooks are registered per event in
//! `~/.claude/settings.json` and receive the event JSON on stdin.

use serde_json::{json, Value};

use super::script::{HookInput, HookScript};
use super::{fenced, payload_text, text_field, truncate, AgentAdapter, AgentConfig, HookData};

const PREVIEW_LIMIT: usize = 1800;
const OUTPUT_LIMIT: usize = 1900;

/// Events the settings fragment subscribes the hook script to.
const HOOKED_EVENTS: &[&str] = &["Stop", "Notification", "PostToolUse"];

pub struct ClaudeAdapter {
    config: AgentConfig,
}

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::simple("claude", "Claude Code"),
        }
    }
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for ClaudeAdapter {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn format_hook_output(&self, data: &HookData) -> String {
        let event = text_field(data, &["hook_event_name", "hookEventName"])
            .unwrap_or_else(|| "unknown".to_string());

        match event.as_str() {
            "Stop" | "SubagentStop" => match text_field(data, &["last_assistant_message"]) {
                Some(message) => fenced(
                    "✅ **Claude Turn Complete**",
                    &truncate(&message, PREVIEW_LIMIT),
                ),
                None => "✅ **Claude Turn Complete**\nClaude has finished responding.".to_string(),
            },
            "Notification" => {
                let message = text_field(data, &["message"])
                    .unwrap_or_else(|| "Claude is waiting for your input.".to_string());
                format!(
                    "⚠️ **Claude Needs Attention**\n{}",
                    truncate(&message, PREVIEW_LIMIT)
                )
            }
            "PostToolUse" => {
                let tool = text_field(data, &["tool_name"]).unwrap_or_else(|| "unknown".to_string());
                let output = text_field(data, &["tool_response", "output"]).unwrap_or_default();
                fenced(
                    &format!("**Claude** - 🔧 {tool}"),
                    &truncate(&output, PREVIEW_LIMIT),
                )
            }
            _ => fenced(
                &format!("🤖 **{event}** (Claude)"),
                &truncate(&payload_text(data), OUTPUT_LIMIT),
            ),
        }
    }

    fn hook_script(&self, bridge_port: u16) -> String {
        HookScript {
            description: "Claude Code hook",
            endpoint: &self.config.hook_endpoint,
            input: HookInput::Stdin,
            response: None,
        }
        .render(bridge_port)
    }

    fn hook_install_path(&self) -> &'static str {
        "~/.claude/settings.json"
    }

    fn settings_config(&self, script_path: &str) -> Value {
        let entry = json!([{
            "hooks": [{ "type": "command", "command": script_path }]
        }]);

        let hooks: serde_json::Map<String, Value> = HOOKED_EVENTS
            .iter()
            .map(|event| (event.to_string(), entry.clone()))
            .collect();

        json!({ "hooks": hooks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::TRUNCATION_MARKER;
    use crate::agents::script::testing::{capture_one_request, run_hook_script};
    use std::time::Duration;
    use tokio::time::timeout;

    fn data(value: Value) -> HookData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_stop_with_message() {
        let out = ClaudeAdapter::new().format_hook_output(&data(json!({
            "hook_event_name": "Stop",
            "session_id": "abc",
            "last_assistant_message": "Refactor finished."
        })));
        assert_eq!(out, "✅ **Claude Turn Complete**\n```\nRefactor finished.\n```");
    }

    #[test]
    fn test_stop_without_message() {
        let out = ClaudeAdapter::new().format_hook_output(&data(json!({
            "hook_event_name": "Stop",
            "stop_hook_active": false
        })));
        assert!(out.starts_with("✅ **Claude Turn Complete**"));
        assert!(!out.contains("```"));
    }

    #[test]
    fn test_notification_has_no_fence() {
        let out = ClaudeAdapter::new().format_hook_output(&data(json!({
            "hook_event_name": "Notification",
            "message": "Claude needs your permission to use Bash"
        })));
        assert_eq!(
            out,
            "⚠️ **Claude Needs Attention**\nClaude needs your permission to use Bash"
        );
    }

    #[test]
    fn test_post_tool_use() {
        let out = ClaudeAdapter::new().format_hook_output(&data(json!({
            "hook_event_name": "PostToolUse",
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "tool_response": {"stdout": "Cargo.toml\nsrc", "stderr": ""}
        })));
        assert!(out.starts_with("**Claude** - 🔧 Bash\n```\n"));
        assert!(out.contains("Cargo.toml\\nsrc"));
    }

    #[test]
    fn test_unrecognized_event_dumps_payload() {
        let out = ClaudeAdapter::new().format_hook_output(&data(json!({
            "hook_event_name": "SessionStart",
            "source": "startup"
        })));
        assert!(out.starts_with("🤖 **SessionStart** (Claude)\n```\n"));
        assert!(out.contains("\"source\": \"startup\""));
    }

    #[test]
    fn test_missing_fields_degrade() {
        let out = ClaudeAdapter::new().format_hook_output(&HookData::new());
        assert_eq!(out, "🤖 **unknown** (Claude)\n```\n{}\n```");
    }

    #[test]
    fn test_long_payload_truncated() {
        let out = ClaudeAdapter::new().format_hook_output(&data(json!({
            "hook_event_name": "PostToolUse",
            "tool_name": "Read",
            "tool_response": "q".repeat(PREVIEW_LIMIT * 2)
        })));
        assert!(out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_hook_script() {
        let script = ClaudeAdapter::new().hook_script(18470);
        assert!(script.contains("HOOK_INPUT=$(cat)"));
        assert!(script.contains("/hook/${PROJECT_NAME}/claude\""));
        assert!(!script.contains("echo '"));
    }

    #[test]
    fn test_settings_config() {
        let settings = ClaudeAdapter::new().settings_config("/home/me/.claude/hook.sh");
        for event in HOOKED_EVENTS {
            let hook = &settings["hooks"][*event][0]["hooks"][0];
            assert_eq!(hook["type"], "command");
            assert_eq!(hook["command"], "/home/me/.claude/hook.sh");
        }
    }

    #[tokio::test]
    async fn test_script_posts_stdin_to_bridge() {
        let (port, request) = capture_one_request().await;
        let payload = br#"{"hook_event_name":"Stop","last_assistant_message":"it's \"q\"\nnext"}"#;

        let output = run_hook_script(
            &ClaudeAdapter::new().hook_script(1),
            Some(port),
            Some("web-app"),
            &[],
            payload,
        )
        .await;
        assert!(output.status.success());
        assert!(output.stdout.is_empty());

        let request = timeout(Duration::from_secs(5), request)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.request_line, "POST /hook/web-app/claude HTTP/1.1");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body, payload.to_vec());
    }
}
