//! Command-line interface
//!
//! Runs one-off maintenance work (migrations, a single ingest cycle, a full
//! reconciliation drain) without starting the HTTP server.

use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    configuration::{
        check_batch_size, get_configuration, set_configuration, AppState,
        Config, State, MAX_RECONCILE_BATCH_SIZE,
    },
    error::Error,
    handler::{ingest, reconcile},
    migration,
    provider::{DatabasePool, HTTP},
};

/// NFT listing ETL service
#[derive(Parser)]
#[command(name = "listing-etl")]
#[command(
    about = "NFT listing ingestion and token price reconciliation",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server and the sync tasks (default if no command specified)
    Serve,

    /// Create missing tables and indexes
    Migrate,

    /// Fetch one round of listing events and store them
    Ingest,

    /// Reconcile every pending activity, batch after batch
    Reconcile {
        /// Activities per batch, defaults to RECONCILE_BATCH_SIZE
        #[arg(
            long,
            value_parser = clap::value_parser!(i64).range(1..=MAX_RECONCILE_BATCH_SIZE)
        )]
        batch_size: Option<i64>,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

/// Connects to the database, brings the schema up to date and builds the
/// shared state.
pub async fn init_state(config: Config) -> Result<AppState<State>, Error> {
    let database = DatabasePool::new(&config).await?;
    migration::run_migrations(database.get_pool()).await?;

    let http = HTTP::new(config.clone())?;
    let state = State::new(config, database, http);

    Ok(AppState::new(state))
}

pub async fn run_migrate() -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;

    info!("Running database migrations...");
    migration::run_migrations(database.get_pool()).await?;
    info!("Migrations complete");

    Ok(())
}

pub async fn run_ingest() -> Result<(), Error> {
    let app_state = init_state(init_config()?).await?;
    let inserted = ingest::fetch_insert(app_state).await?;

    info!("Ingest complete, {} new activities", inserted);

    Ok(())
}

pub async fn run_reconcile(batch_size: Option<i64>) -> Result<(), Error> {
    let config = init_config()?;
    let batch_size =
        check_batch_size(batch_size.unwrap_or(config.reconcile_batch_size))?;
    let app_state = init_state(config).await?;

    let processed = reconcile::drain(&app_state, batch_size).await?;
    info!("Reconcile complete, {} activities processed", processed);

    Ok(())
}
