use clap::Parser;
use rating_processor::{
    args::Args,
    database::db::DbClient,
    model::{
        error::ProcessorError,
        orchestrator::UpdateOrchestrator,
        structures::run_summary::{RunMode, RunSummary}
    }
};
use std::{
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc
    }
};
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let client = match DbClient::connect(&args.connection_string).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            error!("Processor cannot run without a valid database connection");
            return ExitCode::FAILURE;
        }
    };

    match client.try_advisory_lock(args.lock_key).await {
        Ok(true) => {}
        Ok(false) => {
            error!("Another rating run holds advisory lock {}; refusing to start", args.lock_key);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Failed to acquire advisory lock {}: {}", args.lock_key, e);
            return ExitCode::FAILURE;
        }
    }

    let result = run(&client, &args).await;

    if let Err(e) = client.advisory_unlock(args.lock_key).await {
        warn!("Failed to release advisory lock {}: {}", args.lock_key, e);
    }

    match result {
        Ok(summary) => {
            info!("Run summary:\n{}", summary);
            if let Some(path) = &args.metrics_json {
                if let Err(e) = write_metrics(path, &summary) {
                    error!("Failed to write metrics to {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Rating run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    let indicatif_layer = IndicatifLayer::new();
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}

fn mode(args: &Args) -> RunMode {
    if args.rebuild {
        RunMode::Rebuild
    } else if let Some(players) = &args.player_ids {
        RunMode::for_players(players.iter().copied())
    } else {
        RunMode::incremental()
    }
}

/// Runs the engine inside one transaction, committing unless this is a dry run.
async fn run(client: &DbClient, args: &Args) -> Result<RunSummary, ProcessorError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next match boundary");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    client.begin().await?;

    let orchestrator = UpdateOrchestrator::new(client)
        .with_cancel_flag(cancel)
        .with_progress(true);

    match orchestrator.run(mode(args)).await {
        Ok(summary) => {
            if args.dry_run {
                client.rollback().await?;
                info!("Dry run: rolled back all changes");
            } else {
                client.commit().await?;
                info!("Committed run {}", summary.run_id);
            }
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback_error) = client.rollback().await {
                error!("Rollback failed: {}", rollback_error);
            }
            Err(e)
        }
    }
}

fn write_metrics(path: &std::path::Path, summary: &RunSummary) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, serde_json::to_string_pretty(summary)?)?;
    info!("Wrote run metrics to {}", path.display());
    Ok(())
}
