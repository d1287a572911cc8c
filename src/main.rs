//! Vacancy Broker - Main Entry Point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn, Level};
use vacancy_broker::config::BrokerConfig;
use vacancy_broker::observability::health::StatusServer;
use vacancy_broker::observability::logging::{init_default_logging, init_logging, LogFormat};
use vacancy_broker::{BrokerError, HhVacancySource, VacancyBroker};

/// Asynchronous vacancy search broker
#[derive(Parser)]
#[command(name = "vacancy-broker")]
#[command(about = "Dispatches vacancy searches to a bounded worker pool")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the broker and its status server until interrupted
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Run a single search in-process and print the JSON response
    Search {
        /// Free-text vacancy query
        #[arg(short, long)]
        query: String,

        /// Requesting user id
        #[arg(short, long, default_value_t = 1)]
        user_id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_cli_logging(cli.verbose);

    info!("Starting vacancy broker v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_broker(config).await,
        Commands::Config { show } => handle_config_command(config, show),
        Commands::Search { query, user_id } => run_search(config, query, user_id).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

/// `-v` flags override `LOG_LEVEL`; everything else comes from the environment
fn init_cli_logging(verbose: u8) {
    let level = match verbose {
        0 => return init_default_logging(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let include_spans = std::env::var("LOG_SPANS")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    init_logging(level, LogFormat::parse(&format), include_spans);
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<BrokerConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(BrokerConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            for path_str in ["broker.toml", "config/broker.toml"] {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(BrokerConfig::load_from_file(&path)?);
                }
            }

            warn!("No configuration file found, using defaults");
            Ok(BrokerConfig::from_toml_str("")?)
        }
    }
}

fn build_broker(config: BrokerConfig) -> Result<VacancyBroker, Box<dyn std::error::Error>> {
    let source = HhVacancySource::new(config.source.clone().into())?;
    Ok(VacancyBroker::new(config, Arc::new(source))?)
}

async fn run_broker(config: BrokerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Broker starting with ID: {}", config.broker.id);

    let health_port = config.health.port;
    let broker = build_broker(config)?;
    broker.start().await?;

    let status_server = Arc::new(StatusServer::new(broker.clone(), health_port));
    let server_handle = tokio::spawn(status_server.start());

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    info!("Broker is running and waiting for requests");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    server_handle.abort();
    broker.shutdown().await?;

    let status = broker.get_status();
    info!(
        processed_requests = status.processed_requests,
        uptime_secs = status.uptime,
        "Broker stopped"
    );
    Ok(())
}

async fn run_search(
    config: BrokerConfig,
    query: String,
    user_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    if query.trim().is_empty() {
        return Err(BrokerError::invalid_input("query must not be empty").into());
    }

    let broker = build_broker(config)?;
    broker.start().await?;

    let response = broker.handle_request(query, user_id).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    broker.shutdown().await?;
    Ok(())
}

fn handle_config_command(
    config: BrokerConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
