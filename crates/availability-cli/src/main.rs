//! `avail` CLI: query staff availability and appointment slots from a JSON
//! snapshot of the rule data.
//!
//! ## Usage
//!
//! ```sh
//! # Free time for one staff member on one date
//! avail resolve -s clinic.json --staff s1 --date 2026-03-16
//!
//! # Hour-long slots, compact JSON written to a file
//! avail slots -s clinic.json --staff s1 --date 2026-03-16 --duration 60 --compact -o slots.json
//!
//! # Same query in another business timezone
//! avail --timezone America/New_York resolve -s clinic.json --staff s1 --date 2026-03-16
//!
//! # Validate a snapshot (read from stdin) and print record counts
//! cat clinic.json | avail check
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).

use std::io::{self, Read};

use anyhow::{Context, Result};
use availability_engine::config::parse_timezone;
use availability_engine::snapshot::LoadedSnapshot;
use availability_engine::validation::parse_date;
use availability_engine::{interval, query, Snapshot, StaffId};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "avail",
    version,
    about = "Staff availability and appointment slot queries"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Business timezone (IANA name); overrides the snapshot's config
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve free time ranges for a staff member on a date
    Resolve {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        snapshot: Option<String>,
        /// Staff member id
        #[arg(long)]
        staff: String,
        /// Local date, YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
    /// List bookable slots of a fixed duration
    Slots {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        snapshot: Option<String>,
        /// Staff member id
        #[arg(long)]
        staff: String,
        /// Local date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Slot length in minutes
        #[arg(long)]
        duration: u32,
    },
    /// Load a snapshot through the mutation API and report record counts
    Check {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        snapshot: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let timezone = cli.timezone.as_deref();

    let value = match cli.command {
        Commands::Resolve {
            snapshot,
            staff,
            date,
        } => {
            let loaded = load_snapshot(snapshot.as_deref(), timezone)?;
            let date = parse_date(&date).context("Invalid --date")?;
            let tables = loaded.service.store().read();
            let response = query::availability(
                &*tables,
                *loaded.service.config(),
                &StaffId::new(staff),
                date,
            );
            debug!(
                total_minutes = interval::total_minutes(&response.ranges),
                "resolved availability"
            );
            serde_json::to_value(response)?
        }
        Commands::Slots {
            snapshot,
            staff,
            date,
            duration,
        } => {
            let loaded = load_snapshot(snapshot.as_deref(), timezone)?;
            let date = parse_date(&date).context("Invalid --date")?;
            let tables = loaded.service.store().read();
            let response = query::slots(
                &*tables,
                *loaded.service.config(),
                &StaffId::new(staff),
                date,
                duration,
                &loaded.bookings,
            )
            .context("Failed to generate slots")?;
            serde_json::to_value(response)?
        }
        Commands::Check { snapshot } => {
            let loaded = load_snapshot(snapshot.as_deref(), timezone)?;
            let counts = loaded.service.store().read().counts();
            json!({
                "ok": true,
                "business_timezone": loaded.service.config().business_timezone.name(),
                "counts": counts,
                "bookings": loaded.bookings.len(),
            })
        }
    };

    let rendered = if cli.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    write_output(cli.output.as_deref(), &rendered)
}

/// Parse and replay a snapshot, applying `--timezone` on top of its config.
fn load_snapshot(path: Option<&str>, timezone: Option<&str>) -> Result<LoadedSnapshot> {
    let json = read_input(path)?;
    let snapshot = Snapshot::from_json(&json).context("Failed to parse snapshot")?;

    let mut config = snapshot.engine_config();
    if let Some(name) = timezone {
        config = config.with_timezone(parse_timezone(name).context("Invalid --timezone")?);
    }
    debug!(timezone = config.business_timezone.name(), "loading snapshot");

    snapshot
        .load(Some(config))
        .context("Failed to load snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, format!("{content}\n"))
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
