use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::warn;

use agent_discord::agents::{expand_home, registry};
use agent_discord::bridge::{forward_hook, MessageSink};
use agent_discord::config::{BridgeConfig, PORT_ENV, PROJECT_ENV};
use agent_discord::daemon::{DaemonManager, DEFAULT_READY_TIMEOUT};
use agent_discord::hooks::{HookContext, OutputForwarder};
use agent_discord::project::ProjectState;
use agent_discord::tmux::TmuxManager;

#[derive(Parser)]
#[command(name = "agent-discord", version, about = "Drive AI coding agents in tmux and relay their hook events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the background forwarding daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// List bridge-owned tmux sessions
    Sessions,
    /// List the windows of a project's session
    Windows { project: String },
    /// Create the project's session and launch an agent in its window
    Start { project: String, agent: String },
    /// Guess what an agent is doing from its pane
    Status { project: String, agent: String },
    /// Print an agent's hook script
    HookScript { agent: String },
    /// Print the config fragment that registers a hook script
    HookConfig { agent: String, script_path: String },
    /// Format a hook payload read from stdin
    Format {
        agent: String,
        #[arg(long, default_value = "")]
        project: String,
    },
    /// Render a tool-output hook context read from stdin
    Forward,
    /// List supported agents
    Agents,
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Spawn the daemon detached and wait for it to accept connections
    Start {
        entry_point: PathBuf,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    Stop,
    Status,
}

/// Writes formatted hook output to stdout.
struct StdoutSink;

#[async_trait]
impl MessageSink for StdoutSink {
    async fn send(&self, _project: &str, _agent: &str, text: &str) -> bool {
        println!("{text}");
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig::from_env().context("invalid bridge configuration")?;

    match cli.command {
        Commands::Daemon { action } => run_daemon(&config, action).await,
        Commands::Sessions => {
            let tmux = TmuxManager::new(&config.session_prefix);
            for session in tmux.list_sessions().await? {
                println!(
                    "{}\t{} windows\t{}\tcreated {}",
                    session.name,
                    session.windows,
                    if session.attached { "attached" } else { "detached" },
                    session.created.to_rfc3339()
                );
            }
            Ok(())
        }
        Commands::Windows { project } => {
            let tmux = TmuxManager::new(&config.session_prefix);
            let session = tmux.session_name(&project);
            for window in tmux.list_windows(&session).await? {
                println!("{window}");
            }
            Ok(())
        }
        Commands::Start { project, agent } => start_agent(&config, &project, &agent).await,
        Commands::Status { project, agent } => {
            let adapter = registry().get(&agent)?;
            let tmux = TmuxManager::new(&config.session_prefix);
            let session = tmux.session_name(&project);
            let status = tmux.window_status(&session, adapter.name()).await?;
            println!("{session}:{} {status:?}", adapter.name());
            Ok(())
        }
        Commands::HookScript { agent } => {
            let adapter = registry().get(&agent)?;
            print!("{}", adapter.hook_script(config.hook_server_port));
            Ok(())
        }
        Commands::HookConfig { agent, script_path } => {
            let adapter = registry().get(&agent)?;
            let target = expand_home(adapter.hook_install_path())
                .context("cannot resolve home directory")?;
            eprintln!("# add to {}", target.display());
            match adapter.native_config(&script_path) {
                Some(native) => println!("{native}"),
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&adapter.settings_config(&script_path))?
                ),
            }
            Ok(())
        }
        Commands::Format { agent, project } => {
            let payload: serde_json::Value = serde_json::from_str(&read_stdin().await?)
                .context("hook payload is not valid JSON")?;
            if !forward_hook(registry(), &StdoutSink, &project, &agent, payload).await? {
                bail!("hook output was not delivered");
            }
            Ok(())
        }
        Commands::Forward => {
            let context: HookContext = serde_json::from_str(&read_stdin().await?)
                .context("hook context is not valid JSON")?;
            let forwarder = OutputForwarder::new();
            let message = forwarder.process_hook_output(&context);
            println!("{}", forwarder.format_message(&message));
            Ok(())
        }
        Commands::Agents => {
            for adapter in registry().adapters() {
                let agent_config = adapter.config();
                println!(
                    "{}\t{}\t{}",
                    agent_config.name,
                    agent_config.display_name,
                    adapter.hook_install_path()
                );
            }
            Ok(())
        }
    }
}

async fn run_daemon(config: &BridgeConfig, action: DaemonAction) -> Result<()> {
    let manager = DaemonManager::from_config(config);
    let port = config.hook_server_port;

    match action {
        DaemonAction::Start { entry_point, args } => {
            if DaemonManager::is_running(port).await {
                println!("daemon already listening on port {port}");
                return Ok(());
            }
            let pid = manager
                .start_daemon(&entry_point, &args)
                .context("failed to start daemon")?;
            if !DaemonManager::wait_for_ready(port, DEFAULT_READY_TIMEOUT).await {
                bail!(
                    "daemon (pid {pid}) did not listen on port {port}; see {}",
                    manager.log_file().display()
                );
            }
            println!("daemon started (pid {pid}, port {port})");
        }
        DaemonAction::Stop => {
            if manager.stop_daemon() {
                println!("daemon stopped");
            } else {
                println!("no daemon to stop");
            }
        }
        DaemonAction::Status => {
            let running = DaemonManager::is_running(port).await;
            let pid = manager
                .tracked_pid()
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "none".to_string());
            println!(
                "port {port}: {}\ntracked pid: {pid}\nlog: {}",
                if running { "listening" } else { "not listening" },
                manager.log_file().display()
            );
        }
    }
    Ok(())
}

async fn start_agent(config: &BridgeConfig, project: &str, agent: &str) -> Result<()> {
    let adapter = registry().get(agent)?;
    let tmux = TmuxManager::new(&config.session_prefix);

    let session = tmux
        .get_or_create_session(project)
        .await
        .with_context(|| format!("failed to prepare session for {project}"))?;
    let port = config.hook_server_port.to_string();
    tmux.set_session_env(&session, PORT_ENV, &port).await?;
    tmux.set_session_env(&session, PROJECT_ENV, project).await?;

    let agent_config = adapter.config();
    tmux.start_agent_in_window(&session, &agent_config.name, &agent_config.command)
        .await?;

    if !DaemonManager::is_running(config.hook_server_port).await {
        warn!(port = config.hook_server_port, "daemon is not listening; hook events will be dropped");
    }

    let path = std::env::current_dir().context("cannot read current directory")?;
    let mut state = ProjectState::new(project, path, &config.session_prefix);
    state.set_agent_running(&agent_config.name, true);
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn read_stdin() -> Result<String> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read stdin")?;
    Ok(input)
}
