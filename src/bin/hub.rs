use std::sync::Arc;

use clap::Parser;
use fever_watch::{
    actors::retention::{RetentionHandle, sweep},
    api::{ApiState, spawn_api_server},
    config::{Config, read_config_file},
    storage::{StorageBackend, open_backend},
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON), defaults are used when omitted
    #[arg(short)]
    file: Option<String>,

    /// Run the retention sweep once and exit
    #[arg(long)]
    sweep_once: bool,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("fever_watch", LevelFilter::TRACE),
        ("fever_hub", LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };
    config.apply_env_overrides();

    let backend = open_backend(&config.storage).await?;

    if args.sweep_once {
        let report = sweep(backend.as_ref(), &config.retention, chrono::Utc::now()).await;
        backend.close().await?;
        let report = report?;
        info!(
            "sweep finished: {} readings and {} resolved alerts deleted",
            report.readings_deleted, report.alerts_deleted
        );
        return Ok(());
    }

    run(config, backend).await
}

async fn run(config: Config, backend: Arc<dyn StorageBackend>) -> anyhow::Result<()> {
    let retention = config
        .retention
        .enabled
        .then(|| RetentionHandle::spawn(backend.clone(), config.retention.clone()));

    let state = ApiState::new(backend.clone(), &config, retention.clone());
    let addr = spawn_api_server(config.api.clone(), state).await?;
    info!("fever hub ready on {addr}");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutting down");

    if let Some(retention) = retention {
        retention.shutdown().await;
    }
    backend.close().await?;

    Ok(())
}
