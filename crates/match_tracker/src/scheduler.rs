//! Periodic poll over every tracked target.
//!
//! Each cycle dispatches one unit per target through the rate gate, runs the
//! units under the concurrency limiter and waits for them until the cycle
//! deadline. Units still running at the deadline are detached and finish in
//! the background. On stop, units holding a slot are drained and units still
//! queued for one are abandoned.

use crate::collaborators::{DeliverySink, Notification};
use crate::config::TrackerConfig;
use crate::deadline::CycleDeadline;
use crate::dedup::NotificationLedger;
use crate::error::TrackerError;
use crate::limiter::ConcurrencyLimiter;
use crate::rate_gate::RateGate;
use crate::reply_context::ContextKind;
use crate::service::MatchService;
use crate::targets::{TargetRegistry, TrackedTarget};
use logger::{now_iso, ApiStatusEvent, EventLogger, MatchDetectedEvent, NotificationEvent, PollCycleEvent};
use match_pipeline::MatchSummary;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, timeout_at, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// First sighting; last-seen recorded, nothing sent.
    Initialized,
    Unchanged,
    NoHistory,
    Notified,
    /// Another unit already owns this (match, destination).
    Duplicate,
    /// Target absent from the match; last-seen advanced, nothing sent.
    DataMissing,
    /// No slot or no admission before the deadline, or stop came first.
    Abandoned,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at:   String,
    pub targets:      usize,
    pub dispatched:   usize,
    pub initialized:  usize,
    pub unchanged:    usize,
    pub no_history:   usize,
    pub notified:     usize,
    pub duplicates:   usize,
    pub data_missing: usize,
    pub abandoned:    usize,
    pub failed:       usize,
    /// Units still running when the cycle returned.
    pub detached:     usize,
    pub elapsed_ms:   u64,
}

impl CycleReport {
    fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Initialized => self.initialized += 1,
            UnitOutcome::Unchanged   => self.unchanged += 1,
            UnitOutcome::NoHistory   => self.no_history += 1,
            UnitOutcome::Notified    => self.notified += 1,
            UnitOutcome::Duplicate   => self.duplicates += 1,
            UnitOutcome::DataMissing => self.data_missing += 1,
            UnitOutcome::Abandoned   => self.abandoned += 1,
            UnitOutcome::Failed      => self.failed += 1,
        }
    }

    fn record_join(&mut self, joined: Result<UnitOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.record(outcome),
            Err(e) => {
                error!("poll unit died: {e}");
                self.failed += 1;
            }
        }
    }

    fn to_event(&self) -> PollCycleEvent {
        PollCycleEvent {
            ts:           now_iso(),
            event:        "POLL_CYCLE",
            targets:      self.targets,
            dispatched:   self.dispatched,
            initialized:  self.initialized,
            unchanged:    self.unchanged,
            no_history:   self.no_history,
            notified:     self.notified,
            duplicates:   self.duplicates,
            data_missing: self.data_missing,
            abandoned:    self.abandoned,
            failed:       self.failed,
            elapsed_ms:   self.elapsed_ms,
        }
    }
}

/// Last cycle, readable from the health endpoint.
#[derive(Default)]
pub struct SchedulerStatus {
    last:   RwLock<Option<CycleReport>>,
    cycles: AtomicU64,
}

impl SchedulerStatus {
    pub fn last_cycle(&self) -> Option<CycleReport> {
        self.last.read().clone()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    fn store(&self, report: CycleReport) {
        *self.last.write() = Some(report);
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything a poll unit touches.
pub struct PollContext {
    pub registry: Arc<TargetRegistry>,
    pub service:  Arc<MatchService>,
    pub ledger:   NotificationLedger,
    pub sink:     Arc<dyn DeliverySink>,
    pub gate:     Arc<RateGate>,
    pub limiter:  ConcurrencyLimiter,
    pub logger:   Option<Arc<EventLogger>>,
}

impl PollContext {
    /// Units still waiting for a slot when `stop` fires are abandoned.
    pub async fn process_target(
        &self,
        target: TrackedTarget,
        deadline: CycleDeadline,
        stop: CancellationToken,
    ) -> UnitOutcome {
        let slot = tokio::select! {
            biased;
            _ = stop.cancelled() => None,
            slot = self.limiter.acquire_before(deadline.at()) => slot,
        };
        let Some(_slot) = slot else {
            debug!("{}: no slot before deadline or stop", target.name);
            return UnitOutcome::Abandoned;
        };

        let latest = match self.service.api().latest_match_id(&target.player_id).await {
            Ok(Some(id)) => id,
            Ok(None) => return UnitOutcome::NoHistory,
            Err(e) => {
                self.report_error(&target.player_id, &e);
                return UnitOutcome::Failed;
            }
        };

        if latest == target.last_match_id {
            return UnitOutcome::Unchanged;
        }
        if target.last_match_id.is_empty() {
            info!("{}: baseline match {latest}", target.name);
            self.advance(&target, &latest).await;
            return UnitOutcome::Initialized;
        }

        info!("{}: new match {} → {latest}", target.name, target.last_match_id);
        self.log(&MatchDetectedEvent {
            ts:             now_iso(),
            event:          "MATCH_DETECTED",
            player:         target.name.clone(),
            destination:    target.destination.clone(),
            previous_match: target.last_match_id.clone(),
            match_id:       latest.clone(),
        });

        match self.notify(&target, &latest).await {
            Ok(outcome) => {
                self.advance(&target, &latest).await;
                outcome
            }
            Err(e) if e.is_transient() => {
                self.report_error(&latest, &e);
                UnitOutcome::Failed
            }
            Err(e) => {
                self.report_error(&latest, &e);
                self.advance(&target, &latest).await;
                UnitOutcome::DataMissing
            }
        }
    }

    async fn notify(&self, target: &TrackedTarget, match_id: &str) -> Result<UnitOutcome, TrackerError> {
        let (summary, transformed) = self.service.fetch_and_transform(match_id, &target.player_id).await?;

        let claim = match self.ledger.claim(match_id, &target.destination) {
            Ok(claim) => claim,
            Err(refused) => {
                debug!("{match_id} → {}: skipped ({refused:?})", target.destination);
                self.log(&NotificationEvent {
                    ts:          now_iso(),
                    event:       "NOTIFICATION_DUPLICATE",
                    match_id:    match_id.to_string(),
                    destination: target.destination.clone(),
                    players:     vec![target.name.clone()],
                    analysis:    "skipped",
                });
                return Ok(UnitOutcome::Duplicate);
            }
        };

        let analysis = self.service.analyze(&transformed).await;
        let notification = Notification {
            match_id:    match_id.to_string(),
            destination: target.destination.clone(),
            players:     self.co_tracked_players(&summary, &target.destination),
            transformed,
            analysis,
        };

        let message_id = self
            .sink
            .deliver(&notification)
            .await
            .map_err(|e| TrackerError::Delivery(e.to_string()))?;
        claim.commit();

        self.service.remember_context(&message_id, ContextKind::Analysis, context_payload(&notification));
        info!(
            "{match_id} → {}: sent as {message_id} ({})",
            notification.destination,
            notification.players.join(", ")
        );
        self.log(&NotificationEvent {
            ts:          now_iso(),
            event:       "NOTIFICATION_SENT",
            match_id:    notification.match_id.clone(),
            destination: notification.destination.clone(),
            players:     notification.players.clone(),
            analysis:    notification.analysis.label(),
        });
        Ok(UnitOutcome::Notified)
    }

    /// Names of tracked players on `destination` who appear in the match.
    fn co_tracked_players(&self, summary: &MatchSummary, destination: &str) -> Vec<String> {
        let present: HashSet<&str> = summary.participants.iter().map(|p| p.puuid.as_str()).collect();
        self.registry
            .by_destination(destination)
            .into_iter()
            .filter(|t| present.contains(t.player_id.as_str()))
            .map(|t| if t.name.is_empty() { t.player_id } else { t.name })
            .collect()
    }

    async fn advance(&self, target: &TrackedTarget, match_id: &str) {
        if let Err(e) = self.registry.commit_last_match(&target.player_id, match_id).await {
            warn!("{}: last-seen {match_id} not persisted: {e}", target.name);
        }
    }

    fn report_error(&self, scope: &str, e: &TrackerError) {
        if e.is_transient() {
            warn!("{scope}: {e}");
        } else {
            info!("{scope}: {e}");
        }
        self.log(&ApiStatusEvent {
            ts:      now_iso(),
            event:   "API_STATUS",
            source:  "match_api".to_string(),
            scope:   scope.to_string(),
            ok:      false,
            kind:    e.kind().to_string(),
            message: e.to_string(),
        });
    }

    fn log<T: Serialize>(&self, event: &T) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(event) {
                warn!("event log write failed: {e}");
            }
        }
    }
}

fn context_payload(n: &Notification) -> serde_json::Value {
    json!({
        "match_id":         n.match_id,
        "target":           n.transformed.target_name,
        "players":          n.players,
        "win":              n.transformed.win,
        "game_mode":        n.transformed.game_mode,
        "duration_minutes": n.transformed.duration_minutes,
        "analysis":         serde_json::to_value(&n.analysis).unwrap_or(serde_json::Value::Null),
    })
}

enum Admission {
    Admitted,
    Expired,
    Stopped,
}

pub struct PollScheduler {
    ctx:      Arc<PollContext>,
    period:   Duration,
    budget:   Duration,
    shutdown: CancellationToken,
    status:   Arc<SchedulerStatus>,
}

impl PollScheduler {
    pub fn new(ctx: PollContext, config: &TrackerConfig, shutdown: CancellationToken) -> Self {
        Self {
            ctx:    Arc::new(ctx),
            period: config.poll_period,
            budget: config.cycle_budget,
            shutdown,
            status: Arc::new(SchedulerStatus::default()),
        }
    }

    pub fn status(&self) -> Arc<SchedulerStatus> {
        Arc::clone(&self.status)
    }

    /// Ticks until the shutdown token fires. The first cycle starts immediately.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "Poll scheduler started ({}s period, {}s budget)",
            self.period.as_secs(),
            self.budget.as_secs()
        );
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
        info!("Poll scheduler stopped");
        Ok(())
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let started = std::time::Instant::now();
        let deadline = CycleDeadline::starting_now(self.budget);
        let targets = self.ctx.registry.snapshot();
        let total = targets.len();
        let mut report = CycleReport { started_at: now_iso(), targets: total, ..Default::default() };

        let mut units = JoinSet::new();
        for (i, target) in targets.into_iter().enumerate() {
            let admission = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Admission::Stopped,
                ok = self.ctx.gate.acquire_before(deadline.at()) => {
                    if ok { Admission::Admitted } else { Admission::Expired }
                }
            };
            match admission {
                Admission::Admitted => {}
                Admission::Stopped => {
                    info!("stop requested, {} targets not dispatched", total - i);
                    break;
                }
                Admission::Expired => {
                    warn!("cycle deadline reached during dispatch, {} targets abandoned", total - i);
                    report.abandoned += total - i;
                    break;
                }
            }

            let ctx = Arc::clone(&self.ctx);
            let stop = self.shutdown.clone();
            units.spawn(async move { ctx.process_target(target, deadline, stop).await });
            report.dispatched += 1;
        }

        let finished = timeout_at(deadline.at(), drain(&mut units, &mut report)).await.is_ok();
        if !finished {
            if self.shutdown.is_cancelled() {
                info!("stop requested, draining {} in-flight units", units.len());
                drain(&mut units, &mut report).await;
            } else {
                warn!("cycle deadline reached, {} units continue detached", units.len());
                report.detached = units.len();
                units.detach_all();
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "cycle: {} targets, {} notified, {} initialized, {} unchanged, {} failed, {} abandoned in {}ms",
            report.targets,
            report.notified,
            report.initialized,
            report.unchanged,
            report.failed,
            report.abandoned,
            report.elapsed_ms
        );
        self.ctx.log(&report.to_event());
        self.status.store(report.clone());
        report
    }
}

async fn drain(units: &mut JoinSet<UnitOutcome>, report: &mut CycleReport) {
    while let Some(joined) = units.join_next().await {
        report.record_join(joined);
    }
}
