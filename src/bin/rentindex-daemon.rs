use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rentindex::config::{default_config_path, Config};
use rentindex::indices::fetchers::{ArgentinaDatosFetcher, BcraIclFetcher, DolarApiFetcher};
use rentindex::indices::{CountryCode, IndexFetcher, IndexService, JsonlIndexStore};
use rentindex::scheduler::RefreshScheduler;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rentindex-daemon")]
#[command(about = "Long-running index refresh daemon")]
struct Cli {
    /// Path to rentindex config file.
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Override the data directory from the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Skip the one-shot historical backfill after startup.
    #[arg(long)]
    no_backfill: bool,

    /// Run one refresh cycle for the configured country and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }
    if cli.no_backfill {
        config.schedule.backfill_on_start = false;
    }

    let country: CountryCode = config
        .country
        .parse()
        .with_context(|| format!("invalid country in config: {:?}", config.country))?;

    let data_dir = config.resolved_data_dir();
    info!(data_dir = %data_dir.display(), %country, "starting rentindex daemon");

    let store = Arc::new(JsonlIndexStore::new(&data_dir));
    let fetchers: Vec<Arc<dyn IndexFetcher>> = vec![
        Arc::new(DolarApiFetcher::new().with_base_url(config.sources.exchange_rates_url.clone())),
        Arc::new(BcraIclFetcher::new().with_url(config.sources.rental_contract_url.clone())),
        Arc::new(
            ArgentinaDatosFetcher::new()
                .with_base_url(config.sources.consumer_price_url.clone()),
        ),
    ];
    let service = Arc::new(IndexService::new(store, fetchers));

    if cli.once {
        let summary = service.refresh(&country).await;
        info!(
            fetched = summary.fetched,
            inserted = summary.inserted,
            "one-shot refresh complete"
        );
        return Ok(());
    }

    let scheduler = RefreshScheduler::from_config(service, &config.schedule, country)?;

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
