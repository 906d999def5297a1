use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tennis_fetcher::cli::{Cli, CliHandler};
use tennis_fetcher::{initialize_logging, FetcherConfig, Pipeline};
use tennis_store::{MemoryStore, PgStore, Store};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = FetcherConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.command.apply_to(&mut config);
    config.validate()?;

    initialize_logging(&config.logging)?;
    info!("Starting tennis sync v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn Store> = if cli.dry_run {
        warn!("Dry run: writing to an in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgStore::connect(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to database")?;
        if config.database.run_migrations {
            store.migrate().await.context("Failed to run migrations")?;
        }
        Arc::new(store)
    };

    let pipeline = Pipeline::new(config, store)?;
    CliHandler::new(pipeline, cli.date).handle_command(cli.command).await
}
