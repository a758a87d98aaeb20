use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Port the forwarding daemon listens on when nothing overrides it.
pub const DEFAULT_HOOK_PORT: u16 = 18470;

/// Prefix applied to every project name to form its tmux session name.
pub const DEFAULT_SESSION_PREFIX: &str = "agent-";

/// Directory under `$HOME` holding the pid and log files.
pub const STATE_DIR_NAME: &str = ".discord-agent-bridge";

/// Read by hook scripts and by [`BridgeConfig::from_env`].
pub const PORT_ENV: &str = "AGENT_DISCORD_PORT";
/// Read by hook scripts; set per tmux session.
pub const PROJECT_ENV: &str = "AGENT_DISCORD_PROJECT";
pub const SESSION_PREFIX_ENV: &str = "AGENT_DISCORD_SESSION_PREFIX";
pub const HOME_ENV: &str = "AGENT_DISCORD_HOME";

/// Runtime settings shared by the session and daemon managers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub session_prefix: String,
    pub hook_server_port: u16,
    pub state_dir: PathBuf,
}

impl BridgeConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let hook_server_port = match non_empty(PORT_ENV) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_HOOK_PORT,
        };

        let session_prefix =
            non_empty(SESSION_PREFIX_ENV).unwrap_or_else(|| DEFAULT_SESSION_PREFIX.to_string());

        let state_dir = match non_empty(HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(STATE_DIR_NAME),
        };

        Ok(Self {
            session_prefix,
            hook_server_port,
            state_dir,
        })
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort {
            var: PORT_ENV,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_lookup(lookup_from(&[(HOME_ENV, "/tmp/bridge")])).unwrap();
        assert_eq!(config.hook_server_port, DEFAULT_HOOK_PORT);
        assert_eq!(config.session_prefix, DEFAULT_SESSION_PREFIX);
        assert_eq!(config.state_dir, PathBuf::from("/tmp/bridge"));
    }

    #[test]
    fn test_overrides() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            (PORT_ENV, "19000"),
            (SESSION_PREFIX_ENV, "bridge-"),
            (HOME_ENV, "/var/lib/bridge"),
        ]))
        .unwrap();
        assert_eq!(config.hook_server_port, 19000);
        assert_eq!(config.session_prefix, "bridge-");
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            (PORT_ENV, ""),
            (SESSION_PREFIX_ENV, "  "),
            (HOME_ENV, "/tmp/bridge"),
        ]))
        .unwrap();
        assert_eq!(config.hook_server_port, DEFAULT_HOOK_PORT);
        assert_eq!(config.session_prefix, DEFAULT_SESSION_PREFIX);
    }

    #[test]
    fn test_invalid_port() {
        for bad in ["abc", "0", "70000"] {
            let err = BridgeConfig::from_lookup(lookup_from(&[(PORT_ENV, bad), (HOME_ENV, "/tmp")]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort { .. }), "{bad}");
        }
    }
}
