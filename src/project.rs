use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Persisted record of one bridged project.
///
/// Storage belongs to the caller; this crate only derives names from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub project_name: String,
    pub project_path: PathBuf,
    /// Full tmux session name, prefix included
    pub tmux_session: String,
    /// Agent name to destination channel id
    #[serde(default)]
    pub discord_channels: BTreeMap<String, Option<String>>,
    /// Agent name to "is running"
    #[serde(default)]
    pub agents: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl ProjectState {
    pub fn new(project_name: &str, project_path: impl Into<PathBuf>, session_prefix: &str) -> Self {
        let now = Utc::now();
        Self {
            project_name: project_name.to_string(),
            project_path: project_path.into(),
            tmux_session: format!("{session_prefix}{project_name}"),
            discord_channels: BTreeMap::new(),
            agents: BTreeMap::new(),
            created_at: now,
            last_active: now,
        }
    }

    /// Record an agent as started (or stopped) and bump `last_active`.
    pub fn set_agent_running(&mut self, agent: &str, running: bool) {
        self.agents.insert(agent.to_string(), running);
        self.last_active = Utc::now();
    }

    /// Session name this project maps to under `prefix`.
    pub fn session_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.project_name)
    }

    pub fn channel_for(&self, agent: &str) -> Option<&str> {
        self.discord_channels.get(agent).and_then(|c| c.as_deref())
    }

    pub fn running_agents(&self) -> impl Iterator<Item = &str> {
        self.agents
            .iter()
            .filter(|(_, running)| **running)
            .map(|(name, _)| name.as_str())
    }
}
