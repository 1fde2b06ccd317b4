//! Match → TransformedMatch.
//!
//! Pure: no I/O, no caching. Identical inputs give identical output.

use crate::champions::ChampionCatalog;
use crate::normalize::{normalize_player, round_to, NormalizedPlayer, TeamTotals};
use crate::timeline::{derive_insights, TimelineInsights};
use crate::types::{MatchSummary, Timeline};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("target {target_id} not found among participants of {match_id}")]
    DataMissing { match_id: String, target_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneMatchup {
    /// Role slot shared by both sides ("TOP", "JUNGLE", ...)
    pub role:     String,
    pub player:   NormalizedPlayer,
    /// Absent in modes without fixed lanes
    pub opponent: Option<NormalizedPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedMatch {
    pub match_id:          String,
    pub duration_secs:     i64,
    pub duration_minutes:  f64,
    pub game_mode:         String,
    pub win:               bool,
    pub target_name:       String,
    pub teammates:         Vec<NormalizedPlayer>,
    pub lane_matchups:     Vec<LaneMatchup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_insights: Option<TimelineInsights>,
}

/// Transformer bound to a champion catalog.
#[derive(Debug, Clone, Default)]
pub struct MatchTransformer {
    catalog: Arc<ChampionCatalog>,
}

impl MatchTransformer {
    pub fn new(catalog: Arc<ChampionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn transform(
        &self,
        summary:   &MatchSummary,
        target_id: &str,
        timeline:  Option<&Timeline>,
    ) -> Result<TransformedMatch, TransformError> {
        let raw_minutes = summary.duration_secs as f64 / 60.0;
        let minutes = if raw_minutes <= 0.0 { 1.0 } else { raw_minutes };

        let Some(target) = summary.participants.iter().find(|p| p.puuid == target_id) else {
            return Err(TransformError::DataMissing {
                match_id:  summary.match_id.clone(),
                target_id: target_id.to_string(),
            });
        };
        let target_team = target.team_id;

        let mut totals: HashMap<u32, TeamTotals> = HashMap::new();
        let mut teammates = Vec::new();
        let mut enemies = Vec::new();
        for p in &summary.participants {
            let team = *totals
                .entry(p.team_id)
                .or_insert_with(|| TeamTotals::for_team(&summary.participants, p.team_id));
            let normalized = normalize_player(p, minutes, &team, &self.catalog);
            if p.team_id == target_team {
                teammates.push(normalized);
            } else {
                enemies.push(normalized);
            }
        }

        let lane_matchups = teammates
            .iter()
            .map(|mate| LaneMatchup {
                role:     mate.team_position.clone(),
                player:   mate.clone(),
                opponent: enemies.iter().find(|e| e.team_position == mate.team_position).cloned(),
            })
            .collect();

        let timeline_insights =
            timeline.map(|t| derive_insights(t, target_id, target_team, &summary.participants));

        Ok(TransformedMatch {
            match_id:         summary.match_id.clone(),
            duration_secs:    summary.duration_secs,
            duration_minutes: round_to(minutes, 1),
            game_mode:        summary.game_mode.clone(),
            win:              target.win,
            target_name:      target.riot_id_game_name.clone(),
            teammates,
            lane_matchups,
            timeline_insights,
        })
    }
}

/// Transform without champion metadata.
pub fn transform(
    summary:   &MatchSummary,
    target_id: &str,
    timeline:  Option<&Timeline>,
) -> Result<TransformedMatch, TransformError> {
    MatchTransformer::default().transform(summary, target_id, timeline)
}
