//! Fogger Service - Background controller and HTTP API.
//!
//! Run with: `cargo run -p fogger-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::{Parser, Subcommand, ValueEnum};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use fogger_service::{AppState, Config, SqliteEventLog, api, controller};
use fogger_store::{EventQuery, Store};

/// Fogger Service - Background controller and HTTP REST API.
#[derive(Parser, Debug)]
#[command(name = "fogger-service")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long, global = true)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Seed for the simulated sensor (overrides config).
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the service in the foreground (default behavior).
    Run,

    /// Inspect or clear the event log.
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },
}

#[derive(Subcommand, Debug)]
enum EventsAction {
    /// Print the most recent events, newest first.
    List {
        /// Maximum number of events.
        #[arg(short, long, default_value_t = 20)]
        limit: u32,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the number of stored events.
    Count,

    /// Delete every stored event.
    Clear {
        /// Skip the confirmation check.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fogger_service=info".parse()?)
                .add_directive("fogger_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = load_config(&args)?;

    match args.command {
        Some(Command::Events { action }) => handle_events_action(&config, action),
        Some(Command::Run) | None => run_server(config).await,
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(db_path) = &args.database {
        config.storage.path = db_path.clone();
    }
    if let Some(seed) = args.seed {
        config.sensor.seed = Some(seed);
    }

    config.validate()?;
    Ok(config)
}

fn handle_events_action(config: &Config, action: EventsAction) -> anyhow::Result<()> {
    let store = Store::open(&config.storage.path)?;

    match action {
        EventsAction::List { limit, format } => {
            let query = EventQuery::new().limit(limit);
            match format {
                OutputFormat::Csv => {
                    store.export_csv(std::io::stdout().lock(), &query)?;
                }
                OutputFormat::Json => {
                    let events = store.query_events(&query)?;
                    println!("{}", serde_json::to_string_pretty(&events)?);
                }
                OutputFormat::Text => {
                    let events = store.query_events(&query)?;
                    if events.is_empty() {
                        println!("No events recorded");
                    }
                    for stored in events {
                        let e = &stored.event;
                        println!(
                            "#{:<5} {:<3} {:>5.1}°C {:>5.1}%  {:<8} {} {}  {}",
                            stored.id,
                            e.status,
                            e.temperature,
                            e.humidity,
                            e.duration_label,
                            e.date,
                            e.time,
                            e.reason
                        );
                    }
                }
            }
        }
        EventsAction::Count => {
            println!("{}", store.count_events()?);
        }
        EventsAction::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear the event log without --yes");
            }
            let deleted = store.clear_events()?;
            println!("Deleted {} event(s)", deleted);
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    // Open the database
    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;
    let events = Arc::new(SqliteEventLog::new(store));

    // Start the control loop
    let (handle, running) = controller::spawn(&config, Arc::clone(&events))?;

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse()?;

    // Create application state
    let state = AppState::new(events, handle, config);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    info!("Starting server on {}", addr);

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping controller");
    running.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
