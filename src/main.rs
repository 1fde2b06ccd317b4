/// rift-watch — Match Watcher
///
/// What it does:
///   1. Every minute, checks each tracked player's latest match (rate-gated, bounded fan-out)
///   2. New match → transform → AI analysis → one notification per destination
///   3. Keeps reply context per sent message for follow-up questions
///
/// Run:
///   cargo run --bin rift-watch

mod analyzer;
mod config;
mod delivery;
mod health;
mod kv_store;

use analyzer::{DisabledAnalyzer, HttpAnalyzer};
use anyhow::{Context, Result};
use config::{AppConfig, SeedTarget};
use delivery::{JournalDelivery, WebhookDelivery};
use dotenv::dotenv;
use health::HealthState;
use kv_store::SqliteStore;
use logger::{now_iso, EventLogger};
use match_pipeline::{ChampionCatalog, MatchTransformer};
use match_tracker::{
    Analyzer, ConcurrencyLimiter, ContextSweeper, DeliverySink, KeyValueStore, MatchService, NotificationLedger,
    PollContext, PollScheduler, RateGate, ReplyContextCache, TargetRegistry, TrackedTarget,
};
use riot_api::RiotClient;
use std::env;
use std::fs::File;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== rift-watch — match watcher ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("rift_watch.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of rift-watch is already running! Exiting.");
            return Ok(());
        }
    };

    let cfg = AppConfig::from_env()?;
    info!(
        "Poll every {}s (budget {}s), {} concurrent, {}ms between lookups",
        cfg.tracker.poll_period.as_secs(),
        cfg.tracker.cycle_budget.as_secs(),
        cfg.tracker.concurrency,
        cfg.tracker.rate_period.as_millis()
    );
    info!("Logs: {}/", cfg.log_dir);

    let logger = Arc::new(EventLogger::new(&cfg.log_dir));
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteStore::open(&cfg.store_db_path).with_context(|| format!("store at {}", cfg.store_db_path))?);
    let riot = Arc::new(RiotClient::new(cfg.riot.clone()).with_store(Arc::clone(&store)));

    let registry = Arc::new(TargetRegistry::new(Arc::clone(&store), cfg.tracker.tracked_players_key.clone()));
    registry.load().await.context("load tracked players")?;
    seed_targets(&registry, &riot, &cfg.seed_targets).await;
    if registry.is_empty() {
        warn!("No tracked players; set TRACK_PLAYERS=Name#Tag@destination to add some");
    }

    let catalog = Arc::new(ChampionCatalog::load_or_empty(&cfg.champion_data_path));
    let analyzer: Arc<dyn Analyzer> = match &cfg.analyzer_url {
        Some(url) => {
            info!("Analyzer: {url}");
            Arc::new(HttpAnalyzer::new(url.clone(), cfg.tracker.analyzer_timeout))
        }
        None => {
            warn!("ANALYZER_URL not set, notifications go out without analysis");
            Arc::new(DisabledAnalyzer)
        }
    };

    let contexts = Arc::new(ReplyContextCache::new(cfg.tracker.context_capacity, cfg.tracker.context_ttl));
    let service = Arc::new(MatchService::new(
        riot,
        analyzer,
        MatchTransformer::new(catalog),
        cfg.tracker.analyzer_timeout,
        cfg.tracker.analysis_cache_capacity,
        Arc::clone(&contexts),
    ));

    let journal = JournalDelivery::new(Arc::clone(&logger));
    let sink: Arc<dyn DeliverySink> = match &cfg.webhook_url {
        Some(url) => {
            info!("Delivery: webhook {url}");
            Arc::new(WebhookDelivery::new(url.clone(), journal))
        }
        None => {
            info!("Delivery: journal only");
            Arc::new(journal)
        }
    };

    let ledger = NotificationLedger::new(cfg.tracker.ledger_capacity);
    let shutdown = CancellationToken::new();

    let scheduler = PollScheduler::new(
        PollContext {
            registry: Arc::clone(&registry),
            service:  Arc::clone(&service),
            ledger:   ledger.clone(),
            sink,
            gate:     Arc::new(RateGate::new(cfg.tracker.rate_period)),
            limiter:  ConcurrencyLimiter::new(cfg.tracker.concurrency),
            logger:   Some(Arc::clone(&logger)),
        },
        &cfg.tracker,
        shutdown.clone(),
    );
    let health_state = HealthState {
        started_at: now_iso(),
        registry,
        service,
        ledger,
        scheduler: scheduler.status(),
    };
    let sweeper = ContextSweeper::new(contexts, cfg.tracker.sweep_period, Some(logger), shutdown.clone());

    let mut tasks = JoinSet::new();
    tasks.spawn(scheduler.run());
    tasks.spawn(sweeper.run());
    tasks.spawn(health::start_http_server(cfg.health_bind, health_state, shutdown.clone()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            joined = tasks.join_next() => match joined {
                Some(res) => log_task_exit(res),
                None => break,
            },
        }
    }

    shutdown.cancel();
    while let Some(res) = tasks.join_next().await {
        log_task_exit(res);
    }
    info!("rift-watch stopped");
    Ok(())
}

fn log_task_exit(res: Result<Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("task ended with error: {e:#}"),
        Err(e) => error!("task panicked: {e}"),
    }
}

/// Resolves and tracks every seed not already tracked, then saves once.
async fn seed_targets(registry: &TargetRegistry, riot: &RiotClient, seeds: &[SeedTarget]) {
    let mut added = 0;
    for seed in seeds {
        let puuid = match riot.resolve_puuid(&seed.game_name, &seed.tag_line).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Cannot track {}: {e}", seed.display_name());
                continue;
            }
        };
        let existing = registry.get(&puuid);
        if existing.as_ref().is_some_and(|t| t.destination == seed.destination) {
            continue;
        }
        let mut target = TrackedTarget::new(puuid, seed.destination.clone(), seed.display_name());
        target.last_match_id = existing.map(|t| t.last_match_id).unwrap_or_default();
        let previous = registry.track(target);
        info!(
            "Tracking {} → {}{}",
            seed.display_name(),
            seed.destination,
            if previous.is_some() { " (destination changed)" } else { "" }
        );
        added += 1;
    }
    if added > 0 {
        if let Err(e) = registry.save().await {
            warn!("Tracked players not saved: {e}");
        }
    }
}
