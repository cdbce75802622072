use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenario_engine::api::{self, SimulateArgs};
use scenario_engine::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "scenario-engine",
    version,
    about = "Monte Carlo projections, historical stress tests and goal probabilities"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON simulation API
    Serve {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Overrides the configured port")]
        port: Option<u16>,
    },
    /// Run one simulation and print the result as JSON
    Simulate(SimulateArgs),
    /// Print the stress scenario catalog
    Scenarios,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,scenario_engine=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve { config, port } => serve(config, port).await,
        Command::Simulate(args) => api::run_cli_simulation(&args)
            .map(|json| println!("{json}"))
            .map_err(|e| e.to_string()),
        Command::Scenarios => api::scenarios_json()
            .map(|json| println!("{json}"))
            .map_err(|e| e.to_string()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn serve(config_path: Option<PathBuf>, port: Option<u16>) -> Result<(), String> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ServerConfig::from_file(&path).map_err(|e| e.to_string())?
        }
        None => {
            info!("Using default configuration");
            ServerConfig::default()
        }
    };
    if let Some(port) = port {
        config.port = port;
    }

    api::run_http_server(config)
        .await
        .map_err(|e| format!("Server error: {e}"))
}
