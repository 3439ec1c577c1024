use clap::Parser;
use tracing::{error, Level};

use listing_etl::{
    cli::{self, Cli, Commands},
    configuration::{AppState, State},
    error::Error,
    handler::{ingest, reconcile},
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Migrate) => cli::run_migrate().await,
        Some(Commands::Ingest) => cli::run_ingest().await,
        Some(Commands::Reconcile { batch_size }) => {
            cli::run_reconcile(batch_size).await
        },
        Some(Commands::Serve) | None => serve().await,
    }
}

async fn serve() -> Result<(), Error> {
    let config = match cli::init_config() {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let app_state = cli::init_state(config).await?;

    let (_, _) = tokio::try_join!(
        server::server_task(&app_state),
        start_sync_tasks(app_state.clone()),
    )?;

    Ok(())
}

async fn start_sync_tasks(app_state: AppState<State>) -> Result<(), Error> {
    if !app_state.config.enable_sync {
        return Ok(());
    }

    let (_, _) = tokio::try_join!(
        ingest::ingest_task(app_state.clone()),
        reconcile::reconcile_task(app_state.clone()),
    )?;

    Ok(())
}
