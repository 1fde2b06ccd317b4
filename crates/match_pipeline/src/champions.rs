//! Champion catalog loaded from a Data Dragon `champion.json` dump.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Defense rating reported for champions missing from the catalog.
pub const DEFAULT_DEFENSE: u32 = 5;

#[derive(Debug, Deserialize)]
struct ChampionFile {
    data: HashMap<String, ChampionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChampionEntry {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub info: ChampionRatings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChampionRatings {
    #[serde(default)]
    pub attack:  u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub magic:   u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChampionCatalog {
    by_key: HashMap<String, ChampionEntry>,
}

impl ChampionCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ChampionFile = serde_json::from_str(raw).context("champion.json parse failed")?;
        Ok(Self { by_key: file.data })
    }

    /// Missing file is not fatal: the catalog just stays empty.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match Self::from_json(&raw) {
                Ok(catalog) => {
                    info!("Champion catalog: {} entries from {:?}", catalog.len(), path);
                    catalog
                }
                Err(e) => {
                    warn!("Champion catalog {:?} unreadable: {e}", path);
                    Self::empty()
                }
            },
            Err(e) => {
                warn!("Champion catalog {:?} not loaded: {e}", path);
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// (tags, defense rating) for a champion key as it appears in match data.
    pub fn lookup(&self, champion: &str) -> (Vec<String>, u32) {
        match self.by_key.get(champion) {
            Some(entry) => (entry.tags.clone(), entry.info.defense),
            None => (Vec::new(), DEFAULT_DEFENSE),
        }
    }
}
