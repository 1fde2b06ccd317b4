//! Tracked players and their last-seen match, persisted as one JSON blob.

use crate::collaborators::KeyValueStore;
use crate::error::TrackerError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTarget {
    #[serde(rename = "puuid")]
    pub player_id:     String,
    /// Empty until the first poll records a baseline.
    #[serde(default)]
    pub last_match_id: String,
    #[serde(rename = "channel_id")]
    pub destination:   String,
    #[serde(default)]
    pub name:          String,
}

impl TrackedTarget {
    pub fn new(player_id: impl Into<String>, destination: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            player_id:     player_id.into(),
            last_match_id: String::new(),
            destination:   destination.into(),
            name:          name.into(),
        }
    }
}

pub struct TargetRegistry {
    store:     Arc<dyn KeyValueStore>,
    key:       String,
    targets:   RwLock<HashMap<String, TrackedTarget>>,
    save_lock: tokio::sync::Mutex<()>,
}

impl TargetRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key:       key.into(),
            targets:   RwLock::new(HashMap::new()),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces in-memory state with what the store holds. A missing or
    /// undecodable blob leaves the registry empty.
    pub async fn load(&self) -> Result<usize, TrackerError> {
        let raw = self
            .store
            .get(&self.key)
            .await
            .map_err(|e| TrackerError::Storage(e.to_string()))?;

        let loaded: HashMap<String, TrackedTarget> = match raw {
            None => HashMap::new(),
            Some(body) => serde_json::from_str(&body).unwrap_or_else(|e| {
                warn!("tracked players blob under {} is unreadable: {e}", self.key);
                HashMap::new()
            }),
        };
        let count = loaded.len();
        *self.targets.write() = loaded;
        info!("Loaded {count} tracked players");
        Ok(count)
    }

    /// Writes the full registry. Saves are serialized so the last write
    /// always carries every update made before it.
    pub async fn save(&self) -> Result<(), TrackerError> {
        let _guard = self.save_lock.lock().await;
        let body = {
            let targets = self.targets.read();
            serde_json::to_string(&*targets).map_err(|e| TrackerError::Storage(e.to_string()))?
        };
        self.store
            .set(&self.key, &body)
            .await
            .map_err(|e| TrackerError::Storage(e.to_string()))
    }

    /// Copy of every target, ordered by player id.
    pub fn snapshot(&self) -> Vec<TrackedTarget> {
        let mut all: Vec<TrackedTarget> = self.targets.read().values().cloned().collect();
        all.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        all
    }

    pub fn get(&self, player_id: &str) -> Option<TrackedTarget> {
        self.targets.read().get(player_id).cloned()
    }

    /// Returns the replaced entry, if the player was already tracked.
    pub fn track(&self, target: TrackedTarget) -> Option<TrackedTarget> {
        self.targets.write().insert(target.player_id.clone(), target)
    }

    pub fn untrack(&self, player_id: &str) -> Option<TrackedTarget> {
        self.targets.write().remove(player_id)
    }

    pub fn by_destination(&self, destination: &str) -> Vec<TrackedTarget> {
        let mut found: Vec<TrackedTarget> = self
            .targets
            .read()
            .values()
            .filter(|t| t.destination == destination)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        found
    }

    /// `false` when the player is no longer tracked.
    pub fn update_last_match(&self, player_id: &str, match_id: &str) -> bool {
        match self.targets.write().get_mut(player_id) {
            Some(t) => {
                t.last_match_id = match_id.to_string();
                true
            }
            None => false,
        }
    }

    /// Update plus save.
    pub async fn commit_last_match(&self, player_id: &str, match_id: &str) -> Result<bool, TrackerError> {
        if !self.update_last_match(player_id, match_id) {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.targets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MemoryStore;

    #[tokio::test]
    async fn load_reads_legacy_field_names() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("players", r#"{"p1":{"puuid":"p1","last_match_id":"EUW1_1","channel_id":"chan","name":"Faker"}}"#)
            .await
            .unwrap();
        let registry = TargetRegistry::new(store, "players");
        assert_eq!(registry.load().await.unwrap(), 1);

        let t = registry.get("p1").unwrap();
        assert_eq!(t.last_match_id, "EUW1_1");
        assert_eq!(t.destination, "chan");
    }

    #[tokio::test]
    async fn garbage_blob_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set("players", "{not json").await.unwrap();
        let registry = TargetRegistry::new(store, "players");
        assert_eq!(registry.load().await.unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn commit_persists_through_store() {
        let store = Arc::new(MemoryStore::new());
        let registry = TargetRegistry::new(store.clone(), "players");
        registry.track(TrackedTarget::new("p1", "chan", "One"));
        registry.track(TrackedTarget::new("p2", "chan", "Two"));
        registry.track(TrackedTarget::new("p3", "other", "Three"));

        assert!(registry.commit_last_match("p1", "M9").await.unwrap());
        assert!(!registry.commit_last_match("ghost", "M9").await.unwrap());

        let reloaded = TargetRegistry::new(store, "players");
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.get("p1").unwrap().last_match_id, "M9");
        assert_eq!(reloaded.by_destination("chan").len(), 2);
        assert_eq!(reloaded.untrack("p3").unwrap().name, "Three");
        assert_eq!(reloaded.len(), 2);
    }
}
