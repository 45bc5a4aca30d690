//! CLI for beatsub
//!
//! Subcommands:
//! - `server`: run the WebSocket server with its heartbeat
//! - `client`: send one command to a running server and print the replies

use std::sync::Arc;
use std::time::Duration;

use beatsub::broker::{Dispatcher, Heartbeat, TopicRegistry};
use beatsub::client::SessionTable;
use beatsub::client::remote::{Request, run_client};
use beatsub::config::load_config;
use beatsub::transport::start_websocket_server;
use beatsub::utils::error::ServerError;
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "beatsub", version, about = "Publish/subscribe server with heartbeat")]
struct Cli {
    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the WebSocket server
    Server {
        /// Host to bind (overrides configuration)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
        /// Heartbeat interval in seconds (overrides configuration)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Send a command to a running server
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand)]
enum Action {
    /// Subscribe to a topic and print updates until interrupted
    Subscribe { topic: String },
    /// Unsubscribe from a topic
    Unsubscribe { topic: String },
    /// Publish a message to a topic
    Publish { topic: String, message: String },
    /// List all topics
    List,
    /// Show the status of a topic
    Status { topic: String },
}

impl From<Action> for Request {
    fn from(action: Action) -> Self {
        match action {
            Action::Subscribe { topic } => Request::Subscribe { topic },
            Action::Unsubscribe { topic } => Request::Unsubscribe { topic },
            Action::Publish { topic, message } => Request::Publish { topic, message },
            Action::List => Request::List,
            Action::Status { topic } => Request::Status { topic },
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    beatsub::utils::logging::init(&cli.log_level);

    let result = match cli.command {
        Command::Server {
            host,
            port,
            interval,
        } => run_server(host, port, interval).await,
        Command::Client { url, action } => {
            run_client(&url, &Request::from(action), |frame| {
                if let Some(text) = &frame.data.payload {
                    println!("{text}");
                }
            })
            .await
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_server(
    host: Option<String>,
    port: Option<u16>,
    interval: Option<u64>,
) -> Result<(), ServerError> {
    let mut settings = load_config()?;
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(interval) = interval {
        settings.broker.heartbeat_interval_secs = interval;
    }

    let registry = Arc::new(TopicRegistry::new());
    let sessions = Arc::new(SessionTable::new());
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), sessions.clone()));

    let heartbeat = Heartbeat::new(
        registry,
        sessions.clone(),
        Duration::from_secs(settings.broker.heartbeat_interval_secs),
    )
    .spawn();

    let outcome = tokio::select! {
        res = start_websocket_server(settings.addr(), dispatcher, sessions) => {
            if res.is_ok() {
                error!("WebSocket server exited unexpectedly.");
            }
            res
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    };

    heartbeat.shutdown().await;
    outcome
}
