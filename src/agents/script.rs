use crate::config::{PORT_ENV, PROJECT_ENV};

/// How an agent hands its hook payload to the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookInput {
    Stdin,
    FirstArg,
}

/// Template for the bash scripts agents invoke on hook events.
///
/// The script POSTs the raw payload to the local bridge with a 2s timeout
/// and ignores every transport error, so the agent is never blocked.
#[derive(Debug, Clone)]
pub struct HookScript<'a> {
    /// First comment line, e.g. "Codex CLI notify hook"
    pub description: &'a str,
    pub endpoint: &'a str,
    pub input: HookInput,
    /// Printed to stdout after forwarding, for agents that expect a reply
    pub response: Option<&'a str>,
}

impl HookScript<'_> {
    pub fn render(&self, default_port: u16) -> String {
        let description = self.description;
        let endpoint = self.endpoint;
        let read_input = match self.input {
            HookInput::Stdin => "# Hook payload arrives on stdin\nHOOK_INPUT=$(cat)",
            HookInput::FirstArg => {
                "# Hook payload arrives as the first argument, not stdin\nHOOK_INPUT=\"${1:-}\""
            }
        };

        let mut script = format!(
            r#"#!/usr/bin/env bash
# {description} for discord-agent-bridge

BRIDGE_PORT="${{{PORT_ENV}:-{default_port}}}"
PROJECT_NAME="${{{PROJECT_ENV}:-}}"

{read_input}

if [[ -n "$PROJECT_NAME" ]] && [[ -n "$HOOK_INPUT" ]]; then
  printf '%s' "$HOOK_INPUT" | curl -s -X POST \
    -H "Content-Type: application/json" \
    --data-binary @- \
    "http://127.0.0.1:${{BRIDGE_PORT}}/hook/${{PROJECT_NAME}}/{endpoint}" \
    --max-time 2 >/dev/null 2>&1 || true
fi
"#
        );

        if let Some(response) = self.response {
            script.push_str(&format!("\necho '{}'\n", response.replace('\'', "'\\''")));
        }

        script.push_str("\nexit 0\n");
        script
    }
}

/// Loopback stand-in for the bridge, and a runner for generated scripts.
#[cfg(test)]
pub(crate) mod testing {
    use std::process::{Output, Stdio};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::process::Command;
    use tokio::task::JoinHandle;

    use crate::config::{PORT_ENV, PROJECT_ENV};

    pub(crate) struct CapturedRequest {
        pub request_line: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl CapturedRequest {
        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Accept one HTTP request on a free loopback port and answer 200.
    pub(crate) async fn capture_one_request() -> (u16, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let head_end = loop {
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos;
                }
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
            };

            let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
            let mut lines = head.split("\r\n");
            let request_line = lines.next().unwrap_or_default().to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|line| line.split_once(':'))
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .collect();
            let length: usize = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.parse().ok())
                .unwrap_or(0);

            let mut body = buf[head_end + 4..].to_vec();
            while body.len() < length {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed mid-body");
                body.extend_from_slice(&chunk[..n]);
            }

            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();

            CapturedRequest {
                request_line,
                headers,
                body,
            }
        });

        (port, handle)
    }

    /// Run a hook script under bash the way an agent would.
    pub(crate) async fn run_hook_script(
        script: &str,
        port: Option<u16>,
        project: Option<&str>,
        args: &[&str],
        stdin: &[u8],
    ) -> Output {
        let mut command = Command::new("bash");
        command.arg("-c").arg(script).arg("hook").args(args);
        for var in ["http_proxy", "HTTP_PROXY", "all_proxy", "ALL_PROXY"] {
            command.env_remove(var);
        }
        match port {
            Some(port) => command.env(PORT_ENV, port.to_string()),
            None => command.env_remove(PORT_ENV),
        };
        match project {
            Some(project) => command.env(PROJECT_ENV, project),
            None => command.env_remove(PROJECT_ENV),
        };

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        if let Some(mut pipe) = child.stdin.take() {
            // Scripts that take the payload as an argument never read stdin
            let _ = pipe.write_all(stdin).await;
        }
        child.wait_with_output().await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stdin_script() {
        let script = HookScript {
            description: "Test hook",
            endpoint: "demo",
            input: HookInput::Stdin,
            response: None,
        }
        .render(18470);

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("BRIDGE_PORT=\"${AGENT_DISCORD_PORT:-18470}\""));
        assert!(script.contains("PROJECT_NAME=\"${AGENT_DISCORD_PROJECT:-}\""));
        assert!(script.contains("HOOK_INPUT=$(cat)"));
        assert!(script.contains("\"http://127.0.0.1:${BRIDGE_PORT}/hook/${PROJECT_NAME}/demo\""));
        assert!(script.contains("--max-time 2"));
        assert!(script.contains("|| true"));
        assert!(!script.contains("echo '"));
    }

    #[test]
    fn test_render_arg_script_with_response() {
        let script = HookScript {
            description: "Test hook",
            endpoint: "demo",
            input: HookInput::FirstArg,
            response: Some(r#"{"status": "ok"}"#),
        }
        .render(9000);

        assert!(script.contains("HOOK_INPUT=\"${1:-}\""));
        assert!(script.contains(":-9000}"));
        assert!(script.contains("echo '{\"status\": \"ok\"}'"));
    }
}
