//! ARENA daemon — entry point for running the challenge coordinator.

mod runtime;
mod shutdown;

use arena_coordinator::CoordinatorConfig;
use clap::Parser;
use runtime::CoordinatorRuntime;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arena-daemon", about = "ARENA challenge coordinator daemon")]
struct Cli {
    /// Data directory for challenge storage and the settlement journal.
    /// When a config file is provided, defaults to the file's value.
    #[arg(long, env = "ARENA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable RPC server.
    #[arg(long, default_value_t = true, env = "ARENA_ENABLE_RPC")]
    rpc: bool,

    /// RPC server port.
    #[arg(long, env = "ARENA_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable WebSocket server.
    #[arg(long, default_value_t = true, env = "ARENA_ENABLE_WEBSOCKET")]
    websocket: bool,

    /// WebSocket server port.
    #[arg(long, env = "ARENA_WS_PORT")]
    websocket_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "ARENA_LOG_LEVEL")]
    log_level: String,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Coordinator operations.
    #[command(name = "coordinator")]
    Coordinator {
        #[command(subcommand)]
        action: CoordinatorAction,
    },
}

#[derive(clap::Subcommand)]
enum CoordinatorAction {
    /// Run the coordinator.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    arena_utils::init_tracing();

    let cli = Cli::parse();

    let file_config: Option<CoordinatorConfig> = if let Some(ref config_path) = cli.config {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match CoordinatorConfig::from_toml_str(&contents) {
                Ok(cfg) => {
                    tracing::info!("Loaded config from {}", config_path.display());
                    Some(cfg)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {e}, using CLI defaults");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {e}, using CLI defaults",
                    config_path.display()
                );
                None
            }
        }
    } else {
        None
    };

    let config = if let Some(file_cfg) = file_config {
        CoordinatorConfig {
            data_dir: cli.data_dir.unwrap_or(file_cfg.data_dir),
            enable_rpc: cli.rpc,
            rpc_port: cli.rpc_port.unwrap_or(file_cfg.rpc_port),
            enable_websocket: cli.websocket,
            websocket_port: cli.websocket_port.unwrap_or(file_cfg.websocket_port),
            log_level: cli.log_level,
            ..file_cfg
        }
    } else {
        let defaults = CoordinatorConfig::default();
        CoordinatorConfig {
            data_dir: cli.data_dir.unwrap_or(defaults.data_dir.clone()),
            enable_rpc: cli.rpc,
            rpc_port: cli.rpc_port.unwrap_or(defaults.rpc_port),
            enable_websocket: cli.websocket,
            websocket_port: cli.websocket_port.unwrap_or(defaults.websocket_port),
            log_level: cli.log_level,
            ..defaults
        }
    };

    match cli.command {
        Command::Coordinator { action } => match action {
            CoordinatorAction::Run => {
                tracing::info!(
                    "Starting ARENA coordinator (data: {}, RPC:{}, WS:{})",
                    config.data_dir.display(),
                    if config.enable_rpc {
                        config.rpc_port.to_string()
                    } else {
                        "off".into()
                    },
                    if config.enable_websocket {
                        config.websocket_port.to_string()
                    } else {
                        "off".into()
                    },
                );

                let mut coordinator = CoordinatorRuntime::new(config)?;
                coordinator.start().await?;

                tracing::info!("Shutdown signal received — stopping coordinator");
                coordinator.stop().await;

                tracing::info!("ARENA daemon exited cleanly");
            }
        },
    }

    Ok(())
}
