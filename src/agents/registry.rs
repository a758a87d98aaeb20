use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use tracing::debug;

use super::{AgentAdapter, ClaudeAdapter, CodexAdapter, GeminiAdapter};
use crate::error::RegistryError;

/// Adapters keyed by agent name.
pub struct AgentRegistry {
    adapters: BTreeMap<String, Box<dyn AgentAdapter>>,
}

/// Process-wide registry, filled with the built-in adapters on first use
/// and read-only afterwards.
static REGISTRY: Lazy<AgentRegistry> = Lazy::new(|| {
    AgentRegistry::with_builtin_adapters().expect("built-in agent names are unique")
});

pub fn registry() -> &'static AgentRegistry {
    &REGISTRY
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// Claude Code, Gemini CLI and Codex CLI.
    pub fn with_builtin_adapters() -> Result<Self, RegistryError> {
        Self::from_adapters([
            Box::new(ClaudeAdapter::new()) as Box<dyn AgentAdapter>,
            Box::new(GeminiAdapter::new()),
            Box::new(CodexAdapter::new()),
        ])
    }

    /// Registry holding `adapters`, each added through [`register`](Self::register).
    pub fn from_adapters<I>(adapters: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Box<dyn AgentAdapter>>,
    {
        let mut registry = Self::new();
        for adapter in adapters {
            registry.register(adapter)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Box<dyn AgentAdapter>) -> Result<(), RegistryError> {
        let name = adapter.name().to_string();
        if self.adapters.contains_key(&name) {
            return Err(RegistryError::DuplicateAgent(name));
        }
        debug!(agent = %name, "registered agent adapter");
        self.adapters.insert(name, adapter);
        Ok(())
    }

    /// Look up an adapter. An unknown name means a hook cannot be routed.
    pub fn get(&self, name: &str) -> Result<&dyn AgentAdapter, RegistryError> {
        self.adapters
            .get(name)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| RegistryError::UnknownAgent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn adapters(&self) -> impl Iterator<Item = &dyn AgentAdapter> {
        self.adapters.values().map(|adapter| adapter.as_ref())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentConfig, HookData};
    use serde_json::Value;

    struct EchoAdapter(AgentConfig);

    impl AgentAdapter for EchoAdapter {
        fn config(&self) -> &AgentConfig {
            &self.0
        }
        fn format_hook_output(&self, _data: &HookData) -> String {
            "echo".to_string()
        }
        fn hook_script(&self, _bridge_port: u16) -> String {
            String::new()
        }
        fn hook_install_path(&self) -> &'static str {
            "~/.echo"
        }
        fn settings_config(&self, _script_path: &str) -> Value {
            Value::Null
        }
    }

    #[test]
    fn test_global_registry_has_builtins() {
        let names: Vec<_> = registry().names().collect();
        assert_eq!(names, vec!["claude", "codex", "gemini"]);
        assert_eq!(registry().get("codex").unwrap().config().display_name, "Codex CLI");
    }

    #[test]
    fn test_unknown_agent_is_error() {
        let err = registry().get("copilot").err().unwrap();
        assert_eq!(err, RegistryError::UnknownAgent("copilot".to_string()));
        assert!(!registry().contains("copilot"));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = AgentRegistry::new();
        registry
            .register(Box::new(EchoAdapter(AgentConfig::simple("echo", "Echo"))))
            .unwrap();

        let err = registry
            .register(Box::new(EchoAdapter(AgentConfig::simple("echo", "Echo 2"))))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAgent("echo".to_string()));
        assert_eq!(registry.get("echo").unwrap().config().display_name, "Echo");
    }

    #[test]
    fn test_from_adapters_rejects_repeated_name() {
        let err = AgentRegistry::from_adapters([
            Box::new(EchoAdapter(AgentConfig::simple("echo", "Echo"))) as Box<dyn AgentAdapter>,
            Box::new(EchoAdapter(AgentConfig::simple("echo", "Echo again"))),
        ])
        .err()
        .unwrap();
        assert_eq!(err, RegistryError::DuplicateAgent("echo".to_string()));

        let builtins = AgentRegistry::with_builtin_adapters().unwrap();
        assert_eq!(builtins.names().count(), 3);
    }

    #[test]
    fn test_builtin_endpoints_match_names() {
        for adapter in registry().adapters() {
            let config = adapter.config();
            assert_eq!(config.hook_endpoint, config.name);
            assert!(adapter.hook_script(18470).contains(&format!("/{}\"", config.hook_endpoint)));
        }
    }
}
