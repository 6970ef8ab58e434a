//! HTTP server for staff availability.
//!
//! Serves the availability and slot queries plus CRUD over every rule
//! family, backed by an in-memory store. The store can be seeded from a JSON
//! snapshot at startup; bookings come from the snapshot's `bookings` section.

mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use availability_engine::config::parse_timezone;
use availability_engine::Snapshot;
use axum::Router;
use clap::Parser;
use tracing::info;

use crate::routes::{build_router, AppState};

/// Availability server - HTTP API for staff availability and slots
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot file to seed the store with. Starts empty if omitted.
    #[arg(short, long)]
    snapshot: Option<String>,

    /// Business timezone (IANA name); overrides the snapshot's config
    #[arg(long)]
    timezone: Option<String>,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

/// Build the shared state from the command-line arguments.
fn load_state(args: &Args) -> Result<AppState> {
    let snapshot = match &args.snapshot {
        Some(path) => {
            info!(path = %path, "loading snapshot");
            Snapshot::from_path(path).context("Failed to read snapshot")?
        }
        None => Snapshot::default(),
    };

    let mut config = snapshot.engine_config();
    if let Some(name) = &args.timezone {
        config = config.with_timezone(parse_timezone(name).context("Invalid --timezone")?);
    }

    let loaded = snapshot
        .load(Some(config))
        .context("Failed to load snapshot")?;
    let state = AppState {
        service: loaded.service,
        bookings: Arc::new(loaded.bookings),
    };
    info!(
        timezone = state.service.config().business_timezone.name(),
        slot_step_minutes = state.service.config().slot_step_minutes,
        "engine configured"
    );
    Ok(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing availability server");

    let state = load_state(&args)?;
    let app: Router = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", args.bind, args.port))?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
