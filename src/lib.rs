//! Bridge between terminal-based AI coding agents running in tmux and a
//! chat channel.
//!
//! Agents run one per tmux window inside a per-project session managed by
//! [`tmux::TmuxManager`]. Their hook scripts post events to a local
//! forwarding daemon (see [`daemon`]), and [`agents`] adapters turn those
//! payloads into channel-ready text.

pub mod agents;
pub mod bridge;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hooks;
pub mod project;
pub mod tmux;
