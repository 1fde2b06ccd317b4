use anyhow::{bail, Context, Result};
use match_tracker::{env_or, TrackerConfig};
use riot_api::{RiotConfig, DEFAULT_ACCOUNT_BASE_URL, DEFAULT_MATCH_BASE_URL};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// A player to start tracking at boot: `Name#Tag@destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTarget {
    pub game_name:   String,
    pub tag_line:    String,
    pub destination: String,
}

impl SeedTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        let (riot_id, destination) = raw.trim().rsplit_once('@')?;
        let (game_name, tag_line) = riot_id.rsplit_once('#')?;
        if game_name.is_empty() || tag_line.is_empty() || destination.is_empty() {
            return None;
        }
        Some(Self {
            game_name:   game_name.to_string(),
            tag_line:    tag_line.to_string(),
            destination: destination.to_string(),
        })
    }

    pub fn display_name(&self) -> String {
        format!("{}#{}", self.game_name, self.tag_line)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub riot:               RiotConfig,
    pub store_db_path:      String,
    pub champion_data_path: String,
    pub analyzer_url:       Option<String>,
    pub webhook_url:        Option<String>,
    pub health_bind:        SocketAddr,
    pub log_dir:            String,
    pub seed_targets:       Vec<SeedTarget>,
    pub tracker:            TrackerConfig,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let Some(api_key) = non_empty("RIOT_API_KEY") else {
            bail!("RIOT_API_KEY is not set");
        };
        let riot = RiotConfig {
            api_key,
            account_base_url: env_or("RIOT_BASE_URL_ACCOUNT", DEFAULT_ACCOUNT_BASE_URL.to_string()),
            match_base_url:   env_or("RIOT_BASE_URL_MATCH", DEFAULT_MATCH_BASE_URL.to_string()),
            timeout:          Duration::from_secs(env_or("RIOT_TIMEOUT_SECS", 15u64)),
        };

        let health_bind = env_or("HEALTH_BIND", "127.0.0.1:8089".to_string())
            .parse::<SocketAddr>()
            .context("HEALTH_BIND must be host:port")?;

        let seed_targets = non_empty("TRACK_PLAYERS")
            .map(|raw| parse_seeds(&raw))
            .unwrap_or_default();

        Ok(Self {
            riot,
            store_db_path:      env_or("STORE_DB_PATH", "data/rift-watch.sqlite".to_string()),
            champion_data_path: env_or("CHAMPION_DATA_PATH", "data/champion.json".to_string()),
            analyzer_url:       non_empty("ANALYZER_URL"),
            webhook_url:        non_empty("DELIVERY_WEBHOOK_URL"),
            health_bind,
            log_dir:            env_or("LOG_DIR", "logs".to_string()),
            seed_targets,
            tracker:            TrackerConfig::from_env(),
        })
    }
}

/// Comma or semicolon separated; malformed entries are skipped.
pub fn parse_seeds(raw: &str) -> Vec<SeedTarget> {
    raw.split([',', ';'])
        .filter(|s| !s.trim().is_empty())
        .filter_map(SeedTarget::parse)
        .collect()
}
