//! Seams to the outside world: storage, the match API, the analysis model and
//! message delivery. Concrete clients live in the binary and `riot_api`.

use crate::error::TrackerError;
use async_trait::async_trait;
use match_pipeline::{MatchSummary, Timeline, TransformedMatch};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MatchApi: Send + Sync {
    /// Most recent match id, `None` when the player has no history.
    async fn latest_match_id(&self, player_id: &str) -> Result<Option<String>, TrackerError>;
    async fn match_details(&self, match_id: &str) -> Result<MatchSummary, TrackerError>;
    async fn match_timeline(&self, match_id: &str) -> Result<Timeline, TrackerError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerAnalysis {
    pub champion:          String,
    pub player_name:       String,
    pub position:          String,
    pub score:             f64,
    pub vs_opponent:       String,
    pub role_analysis:     String,
    pub highlight:         String,
    pub weakness:          String,
    pub comment:           String,
    pub timeline_analysis: String,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, transformed: &TransformedMatch) -> anyhow::Result<Vec<PlayerAnalysis>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Ready { players: Vec<PlayerAnalysis> },
    Unavailable { reason: String },
}

impl AnalysisOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready { .. }       => "ready",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

/// One message for one destination about one match.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub match_id:    String,
    pub destination: String,
    /// Tracked players on this destination who played in the match.
    pub players:     Vec<String>,
    pub transformed: TransformedMatch,
    pub analysis:    AnalysisOutcome,
}

#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Returns the id of the sent message.
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<String>;
}

/// Process-local store, for tests and runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_tagged_by_status() {
        let v = serde_json::to_value(AnalysisOutcome::Unavailable { reason: "timeout".into() }).unwrap();
        assert_eq!(v["status"], "unavailable");
        assert_eq!(v["reason"], "timeout");
    }

    #[test]
    fn player_analysis_tolerates_missing_fields() {
        let p: PlayerAnalysis = serde_json::from_str(r#"{"champion":"Ahri","score":7.5}"#).unwrap();
        assert_eq!(p.champion, "Ahri");
        assert_eq!(p.score, 7.5);
        assert!(p.weakness.is_empty());
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
