use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::CommandError;

/// Runs a command line and returns its stdout, failing on non-zero exit.
///
/// Every tmux interaction goes through this seam so tests can swap in an
/// in-memory fake.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn exec(&self, command: &str) -> Result<String, CommandError>;
}

/// Executes command lines through `sh -c`
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn exec(&self, command: &str) -> Result<String, CommandError> {
        debug!(command, "exec");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CommandError::new(command, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(CommandError::new(command, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Quote a string as a single shell word.
///
/// Wraps in single quotes; embedded single quotes become `'\''`.
pub fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
pub(crate) use fake::FakeExecutor;

#[cfg(test)]
mod fake {
    use super::*;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

    /// In-memory executor: answers from a closure and records every command.
    pub(crate) struct FakeExecutor {
        handler: Handler,
        commands: Mutex<Vec<String>>,
    }

    impl FakeExecutor {
        pub(crate) fn new<F>(handler: F) -> Self
        where
            F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                commands: Mutex::new(Vec::new()),
            }
        }

        /// Succeeds with empty output for everything.
        pub(crate) fn ok() -> Self {
            Self::new(|_| Ok(String::new()))
        }

        pub(crate) fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }

        pub(crate) fn count_matching(&self, needle: &str) -> usize {
            self.commands()
                .iter()
                .filter(|c| c.contains(needle))
                .count()
        }
    }

    #[async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn exec(&self, command: &str) -> Result<String, CommandError> {
            self.commands.lock().unwrap().push(command.to_string());
            (self.handler)(command).map_err(|message| CommandError::new(command, message))
        }
    }
}
