//! Per-message context so follow-up replies can refer back to what was sent.

use crate::bounded_cache::BoundedCache;
use chrono::{DateTime, Utc};
use logger::{now_iso, ContextSweepEvent, EventLogger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// A match notification with its analysis outcome.
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyContext {
    pub kind:       ContextKind,
    pub payload:    serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub struct ReplyContextCache {
    entries: BoundedCache<String, ReplyContext>,
    ttl:     chrono::Duration,
}

impl ReplyContextCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(24));
        Self { entries: BoundedCache::new(capacity), ttl }
    }

    pub fn remember(&self, message_id: impl Into<String>, kind: ContextKind, payload: serde_json::Value) {
        self.insert(message_id.into(), ReplyContext { kind, payload, created_at: Utc::now() });
    }

    /// At capacity, expired entries are swept before anything live is evicted.
    pub fn insert(&self, message_id: String, ctx: ReplyContext) {
        let cutoff = Utc::now() - self.ttl;
        self.entries.put_with(message_id, ctx, |entries| {
            entries.retain(|_, c| c.created_at > cutoff);
        });
    }

    /// Expired entries stay readable until a sweep removes them.
    pub fn get(&self, message_id: &str) -> Option<ReplyContext> {
        self.entries.get(&message_id.to_string())
    }

    /// Drops entries created at or before `now - ttl`; returns how many went.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.ttl;
        self.entries.retain(|_, c| c.created_at > cutoff)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Periodic TTL sweep over a [`ReplyContextCache`].
pub struct ContextSweeper {
    cache:    Arc<ReplyContextCache>,
    period:   Duration,
    logger:   Option<Arc<EventLogger>>,
    shutdown: CancellationToken,
}

impl ContextSweeper {
    pub fn new(
        cache:    Arc<ReplyContextCache>,
        period:   Duration,
        logger:   Option<Arc<EventLogger>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { cache, period, logger, shutdown }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Context sweeper started ({}s period)", self.period.as_secs());
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(start, self.period);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep_once(),
            }
        }
        info!("Context sweeper stopped");
        Ok(())
    }

    fn sweep_once(&self) {
        let removed = self.cache.sweep_expired(Utc::now());
        let remaining = self.cache.len();
        if removed == 0 {
            debug!("context sweep: nothing expired ({remaining} live)");
            return;
        }
        info!("context sweep: removed {removed}, {remaining} live");
        if let Some(logger) = &self.logger {
            let ev = ContextSweepEvent { ts: now_iso(), event: "CONTEXT_SWEEP", removed, remaining };
            if let Err(e) = logger.log(&ev) {
                warn!("event log write failed: {e}");
            }
        }
    }
}
