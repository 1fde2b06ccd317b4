//! Fetch → transform → analyze, shared by the poll scheduler and on-demand
//! requests.

use crate::bounded_cache::BoundedCache;
use crate::collaborators::{AnalysisOutcome, Analyzer, MatchApi, PlayerAnalysis};
use crate::error::TrackerError;
use crate::reply_context::{ContextKind, ReplyContext, ReplyContextCache};
use match_pipeline::{MatchSummary, MatchTransformer, TransformedMatch};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub transformed: TransformedMatch,
    pub players:     Vec<PlayerAnalysis>,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub summary:     MatchSummary,
    pub transformed: TransformedMatch,
    pub analysis:    AnalysisOutcome,
}

pub struct MatchService {
    api:              Arc<dyn MatchApi>,
    analyzer:         Arc<dyn Analyzer>,
    transformer:      MatchTransformer,
    analyzer_timeout: Duration,
    analyses:         BoundedCache<String, Arc<CachedAnalysis>>,
    contexts:         Arc<ReplyContextCache>,
}

impl MatchService {
    pub fn new(
        api:              Arc<dyn MatchApi>,
        analyzer:         Arc<dyn Analyzer>,
        transformer:      MatchTransformer,
        analyzer_timeout: Duration,
        cache_capacity:   usize,
        contexts:         Arc<ReplyContextCache>,
    ) -> Self {
        Self {
            api,
            analyzer,
            transformer,
            analyzer_timeout,
            analyses: BoundedCache::new(cache_capacity),
            contexts,
        }
    }

    pub fn api(&self) -> &Arc<dyn MatchApi> {
        &self.api
    }

    pub fn contexts(&self) -> &Arc<ReplyContextCache> {
        &self.contexts
    }

    /// Details are required; a missing timeline only drops the insights.
    pub async fn fetch_and_transform(
        &self,
        match_id:  &str,
        target_id: &str,
    ) -> Result<(MatchSummary, TransformedMatch), TrackerError> {
        let summary = self.api.match_details(match_id).await?;
        let timeline = match self.api.match_timeline(match_id).await {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("timeline for {match_id} unavailable ({}), continuing without insights", e.kind());
                None
            }
        };
        let transformed = self.transformer.transform(&summary, target_id, timeline.as_ref())?;
        Ok((summary, transformed))
    }

    /// Never fails: timeouts and analyzer errors come back as `Unavailable`.
    /// Ready results are cached by match id.
    pub async fn analyze(&self, transformed: &TransformedMatch) -> AnalysisOutcome {
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(self.analyzer_timeout, self.analyzer.analyze(transformed)).await;
        match result {
            Ok(Ok(players)) => {
                debug!("analysis for {} took {}ms", transformed.match_id, started.elapsed().as_millis());
                self.analyses.put(
                    transformed.match_id.clone(),
                    Arc::new(CachedAnalysis { transformed: transformed.clone(), players: players.clone() }),
                );
                AnalysisOutcome::Ready { players }
            }
            Ok(Err(e)) => {
                warn!("analysis for {} failed: {e}", transformed.match_id);
                AnalysisOutcome::Unavailable { reason: e.to_string() }
            }
            Err(_) => {
                warn!("analysis for {} timed out after {}s", transformed.match_id, self.analyzer_timeout.as_secs());
                AnalysisOutcome::Unavailable { reason: "timeout".to_string() }
            }
        }
    }

    pub async fn analyze_match(&self, match_id: &str, target_id: &str) -> Result<AnalysisReport, TrackerError> {
        let (summary, transformed) = self.fetch_and_transform(match_id, target_id).await?;
        let analysis = self.analyze(&transformed).await;
        Ok(AnalysisReport { summary, transformed, analysis })
    }

    /// Analysis of the player's most recent match.
    pub async fn analyze_latest(&self, player_id: &str) -> Result<AnalysisReport, TrackerError> {
        let Some(match_id) = self.api.latest_match_id(player_id).await? else {
            return Err(TrackerError::NoRecentMatch { player_id: player_id.to_string() });
        };
        info!("on-demand analysis of {match_id} for {player_id}");
        self.analyze_match(&match_id, player_id).await
    }

    pub fn cached_analysis(&self, match_id: &str) -> Option<Arc<CachedAnalysis>> {
        self.analyses.get(&match_id.to_string())
    }

    pub fn cached_analysis_count(&self) -> usize {
        self.analyses.len()
    }

    pub fn remember_context(&self, message_id: &str, kind: ContextKind, payload: serde_json::Value) {
        self.contexts.remember(message_id, kind, payload);
    }

    pub fn reply_context(&self, message_id: &str) -> Option<ReplyContext> {
        self.contexts.get(message_id)
    }
}
