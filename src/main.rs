use std::path::PathBuf;

use anyhow::{Context, Result};
use appointment_slots::{
    Clock, EventKind, NewEvent, SlotSettings, SystemClock, config::AppConfig, db::Database,
    export_to_csv, get_availabilities, parse_reference_date, parse_timestamp,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "appointment-slots")]
#[command(about = "Compute free appointment slots from opening and appointment events")]
struct Args {
    /// Database URL (overrides configuration)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the events table
    Migrate,
    /// Store a new opening or appointment
    Add {
        /// "opening" or "appointment"
        #[arg(long)]
        kind: EventKind,
        #[arg(long)]
        starts_at: String,
        #[arg(long)]
        ends_at: String,
        /// Repeat every week on the same weekday
        #[arg(long)]
        weekly: bool,
    },
    /// Print all stored events as JSON
    List,
    /// Print free slots per day as JSON
    Availabilities {
        /// Reference date (YYYY-MM-DD or timestamp); defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Write free slots per day to a CSV file
    Export {
        /// Reference date (YYYY-MM-DD or timestamp); defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Delete all stored events
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("appointment_slots=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let database_url = args
        .database_url
        .clone()
        .unwrap_or_else(|| config.database.url.clone());

    let database = Database::new(&database_url).await?;
    let clock = SystemClock;
    let settings = SlotSettings::from(&config.availability);

    match args.command {
        Command::Migrate => {
            tracing::info!("Schema is up to date");
        }
        Command::Add {
            kind,
            starts_at,
            ends_at,
            weekly,
        } => {
            let event = NewEvent::new(kind, parse_timestamp(&starts_at)?, parse_timestamp(&ends_at)?)
                .with_weekly_recurring(weekly);
            let id = database.insert_event(&event).await?;
            println!("{id}");
        }
        Command::List => {
            let events = database.get_events().await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::Availabilities { date } => {
            let reference_date = resolve_reference_date(date.as_deref(), &clock)?;
            let availabilities = get_availabilities(&database, reference_date, settings).await?;
            println!("{}", serde_json::to_string_pretty(&availabilities)?);
        }
        Command::Export { date, output_dir } => {
            let reference_date = resolve_reference_date(date.as_deref(), &clock)?;
            let availabilities = get_availabilities(&database, reference_date, settings).await?;
            let output_dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
            let path = export_to_csv(&availabilities, &output_dir, &clock).await?;
            println!("{}", path.display());
        }
        Command::Clear => {
            let removed = database.clear_events().await?;
            tracing::info!("Removed {} events", removed);
        }
    }

    Ok(())
}

/// Resolve the `--date` argument, falling back to the local date.
fn resolve_reference_date(value: Option<&str>, clock: &impl Clock) -> Result<NaiveDate> {
    match value {
        Some(value) => Ok(parse_reference_date(value)?),
        None => Ok(clock.now_local().date_naive()),
    }
}
