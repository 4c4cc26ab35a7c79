use std::sync::Arc;

use heritage_harvester::config::{HarvestConfig, HarvestSettings, SourceConfig};
use heritage_harvester::harvest::{CancelFlag, HarvestController};
use heritage_harvester::http::HttpTransport;
use heritage_harvester::normalize::LidoNormalizer;
use heritage_harvester::types::{HarvestSummary, HarvestWindow};
use sqlx::PgPool;
use tokio::runtime::Handle;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::db;
use crate::error::{PipelineError, Result};
use crate::sink::IndexSink;
use crate::state_store::PgStateStore;

/// Result of harvesting one source in a round.
#[derive(Debug)]
pub struct SourceRun {
    pub source_id: String,
    pub outcome: Result<HarvestSummary>,
}

/// Run the harvest worker.
///
/// Harvests every configured source once per round, waiting the configured
/// interval between rounds. SIGTERM and SIGINT (ctrl+c) stop running
/// harvests at their next page boundary; their state is left untouched.
pub async fn run_harvest_worker(config: WorkerConfig) -> Result<()> {
    let pipeline_config = config.pipeline_config();
    let pool = db::create_pool(&pipeline_config).await?;
    db::run_migrations(&pool).await?;

    let sources = HarvestConfig::load(&config.sources_file)?;
    let settings = config.harvest_settings(sources.harvesting.clone());

    tracing::info!(
        sources_file = %config.sources_file.display(),
        sources = sources.sources.len(),
        interval = ?config.interval,
        max_tries = settings.max_tries,
        "starting harvest worker"
    );

    let shutdown = CancellationToken::new();
    listen_for_shutdown(shutdown.clone())?;

    loop {
        let runs = run_round(&pool, &sources.sources, &settings, &shutdown).await;
        let failed = runs.iter().filter(|run| run.outcome.is_err()).count();
        tracing::info!(sources = runs.len(), failed, "harvest round finished");

        let Some(interval) = config.interval else {
            break;
        };
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("harvest worker stopped");
    Ok(())
}

fn listen_for_shutdown(shutdown: CancellationToken) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| PipelineError::Worker(format!("failed to register SIGTERM handler: {e}")))?;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, stopping worker"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, stopping worker"),
        }
        shutdown.cancel();
    });
    Ok(())
}

/// Harvest all sources concurrently, each on its own blocking thread.
///
/// A failing source does not affect the others.
pub async fn run_round(
    pool: &PgPool,
    sources: &[SourceConfig],
    settings: &HarvestSettings,
    shutdown: &CancellationToken,
) -> Vec<SourceRun> {
    if shutdown.is_cancelled() {
        return Vec::new();
    }

    let cancel = CancelFlag::new();
    let bridge = tokio::spawn({
        let cancel = cancel.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            cancel.cancel();
        }
    });

    let mut tasks = JoinSet::new();
    for source in sources {
        let pool = pool.clone();
        let handle = Handle::current();
        let source = source.clone();
        let settings = settings.clone();
        let cancel = cancel.clone();
        tasks.spawn_blocking(move || {
            let source_id = source.id.clone();
            let outcome = harvest_source(pool, handle, source, settings, cancel);
            SourceRun { source_id, outcome }
        });
    }

    let mut runs = Vec::with_capacity(sources.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(run) => {
                match &run.outcome {
                    Ok(summary) => tracing::info!(
                        source = %run.source_id,
                        changed = summary.changed,
                        deleted = summary.deleted,
                        unchanged = summary.unchanged,
                        rejected = summary.rejected,
                        "source harvested"
                    ),
                    Err(e) => tracing::error!(source = %run.source_id, error = %e, "source harvest failed"),
                }
                runs.push(run);
            }
            Err(e) => tracing::error!(error = %e, "harvest task panicked"),
        }
    }

    bridge.abort();
    runs
}

/// Harvest one source into the database. Runs on a blocking thread.
fn harvest_source(
    pool: PgPool,
    handle: Handle,
    source: SourceConfig,
    settings: HarvestSettings,
    cancel: CancelFlag,
) -> Result<HarvestSummary> {
    let transport = HttpTransport::new(settings.http_timeout())?;
    let state = Arc::new(PgStateStore::new(pool.clone(), handle.clone()));
    let normalizer = LidoNormalizer::lido(source.driver_params.clone());
    let mut sink = IndexSink::new(pool, handle, source.id.clone(), normalizer);

    let controller =
        HarvestController::new(source, settings, transport, state)?.with_cancel_flag(cancel);
    Ok(controller.harvest(&HarvestWindow::new(), &mut sink)?)
}
