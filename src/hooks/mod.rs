mod output_forwarder;

pub use output_forwarder::{AgentMessage, HookContext, HookSpecificOutput, MessageType, OutputForwarder};
