//! helmsd CLI - command-line control tool for the helmsd proxy daemon
//!
//! Covers the daemon's REST surface (config, proxies, rules, providers,
//! connections) and tails its real-time feeds.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use helmsd_client::{resolve, ControlClient, Daemon, EndpointOptions};

#[derive(Parser)]
#[command(name = "helmsd")]
#[command(author, version, about = "Control CLI for the helmsd proxy daemon")]
#[command(propagate_version = true)]
struct Cli {
    /// Control API host
    #[arg(long, env = "HELMSD_HOST")]
    host: Option<String>,

    /// Control API port
    #[arg(long, env = "HELMSD_PORT")]
    port: Option<u16>,

    /// Bearer secret for the control API
    #[arg(long, env = "HELMSD_SECRET")]
    secret: Option<String>,

    /// Control API protocol ("http" or "https")
    #[arg(long, env = "HELMSD_PROTOCOL")]
    protocol: Option<String>,

    /// Print raw JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the daemon version
    Version,

    /// Show or change the daemon configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List all proxies and groups
    Proxies,

    /// Show one proxy or group
    Proxy {
        /// Proxy or group name
        name: String,
    },

    /// Switch the selected member of a selector group
    Select {
        /// Selector group name
        group: String,

        /// Member to select
        name: String,
    },

    /// Measure a proxy's latency
    Delay {
        /// Proxy name
        name: String,

        /// Probe timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout: u32,

        /// Probe URL (defaults to the daemon's standard target)
        #[arg(long)]
        url: Option<String>,
    },

    /// List routing rules in evaluation order
    Rules,

    /// List proxy providers
    Providers,

    /// Trigger a provider refresh
    Update {
        /// Provider name
        name: String,
    },

    /// Show active connections
    Conns,

    /// Close connections
    Close {
        /// Connection ID to close
        #[arg(required_unless_present = "all")]
        id: Option<String>,

        /// Close every active connection
        #[arg(long)]
        all: bool,
    },

    /// Tail the daemon's log feed
    Logs,

    /// Watch live connection snapshots
    Watch,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Apply a partial configuration update
    Set {
        /// Routing mode: rule, global, direct
        #[arg(long)]
        mode: Option<String>,

        /// Log level: debug, info, warning, error, silent
        #[arg(long)]
        log_level: Option<String>,

        /// Allow LAN clients
        #[arg(long)]
        allow_lan: Option<bool>,

        /// HTTP proxy port
        #[arg(long)]
        port: Option<u16>,

        /// SOCKS5 proxy port
        #[arg(long)]
        socks_port: Option<u16>,

        /// Combined HTTP/SOCKS port
        #[arg(long)]
        mixed_port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let options = EndpointOptions {
        hostname: cli.host.clone(),
        port: cli.port,
        secret: cli.secret.clone(),
        protocol: cli.protocol.clone(),
    };

    match &cli.command {
        Commands::Version => {
            commands::version(&create_client(&options)?, cli.json).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::show_config(&create_client(&options)?, cli.json).await?;
            }
            ConfigAction::Set {
                mode,
                log_level,
                allow_lan,
                port,
                socks_port,
                mixed_port,
            } => {
                commands::set_config(
                    &create_client(&options)?,
                    commands::ConfigChanges {
                        mode: mode.clone(),
                        log_level: log_level.clone(),
                        allow_lan: *allow_lan,
                        port: *port,
                        socks_port: *socks_port,
                        mixed_port: *mixed_port,
                    },
                )
                .await?;
            }
        },

        Commands::Proxies => {
            commands::proxies(&create_client(&options)?, cli.json).await?;
        }

        Commands::Proxy { name } => {
            commands::proxy(&create_client(&options)?, name, cli.json).await?;
        }

        Commands::Select { group, name } => {
            commands::select(&create_client(&options)?, group, name).await?;
        }

        Commands::Delay { name, timeout, url } => {
            commands::delay(&create_client(&options)?, name, *timeout, url.as_deref()).await?;
        }

        Commands::Rules => {
            commands::rules(&create_client(&options)?, cli.json).await?;
        }

        Commands::Providers => {
            commands::providers(&create_client(&options)?, cli.json).await?;
        }

        Commands::Update { name } => {
            commands::update_provider(&create_client(&options)?, name).await?;
        }

        Commands::Conns => {
            commands::connections(&create_client(&options)?, cli.json).await?;
        }

        Commands::Close { id, all } => {
            commands::close(&create_client(&options)?, id.as_deref(), *all).await?;
        }

        Commands::Logs => {
            commands::logs(&Daemon::new(options), cli.json).await?;
        }

        Commands::Watch => {
            commands::watch(&Daemon::new(options), cli.json).await?;
        }
    }

    Ok(())
}

/// Create a control client for the resolved endpoint
fn create_client(options: &EndpointOptions) -> Result<ControlClient> {
    let endpoint = resolve(options)?;
    Ok(ControlClient::new(&endpoint)?)
}
