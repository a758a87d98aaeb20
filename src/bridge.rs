//! Hook dispatch: payload in, formatted text out to the messaging side.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::agents::{AgentRegistry, HookData};
use crate::error::BridgeError;

/// Outbound messaging provider (Discord or similar).
///
/// Receives channel-ready text and reports whether it was delivered.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, project: &str, agent: &str, text: &str) -> bool;
}

/// Interpret a parsed request body as hook data. Anything but a JSON object
/// is rejected.
pub fn hook_data(agent: &str, payload: Value) -> Result<HookData, BridgeError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(BridgeError::NotAnObject {
            agent: agent.to_string(),
        }),
    }
}

/// Format a hook payload with the agent's adapter and hand it to `sink`.
///
/// Returns the sink's delivery result. Failed deliveries are not retried.
pub async fn forward_hook<S>(
    registry: &AgentRegistry,
    sink: &S,
    project: &str,
    agent: &str,
    payload: Value,
) -> Result<bool, BridgeError>
where
    S: MessageSink + ?Sized,
{
    let adapter = registry.get(agent)?;
    let data = hook_data(agent, payload)?;
    let text = adapter.format_hook_output(&data);

    let delivered = sink.send(project, agent, &text).await;
    if delivered {
        debug!(project, agent, len = text.len(), "forwarded hook event");
    } else {
        warn!(project, agent, "hook event dropped: delivery failed");
    }
    Ok(delivered)
}
