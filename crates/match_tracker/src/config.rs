//! Tracker tuning, read from the environment with defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// `env::var(key)` parsed into `T`, falling back to `default` when unset or invalid.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub tracked_players_key:     String,
    pub poll_period:             Duration,
    /// Wall-clock budget per cycle; keep it below `poll_period`
    pub cycle_budget:            Duration,
    pub rate_period:             Duration,
    pub concurrency:             usize,
    pub analyzer_timeout:        Duration,
    pub ledger_capacity:         usize,
    pub analysis_cache_capacity: usize,
    pub context_capacity:        usize,
    pub context_ttl:             Duration,
    pub sweep_period:            Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracked_players_key:     "riftwatch:tracked_players".to_string(),
            poll_period:             Duration::from_secs(60),
            cycle_budget:            Duration::from_secs(55),
            rate_period:             Duration::from_millis(100),
            concurrency:             5,
            analyzer_timeout:        Duration::from_secs(90),
            ledger_capacity:         50,
            analysis_cache_capacity: 20,
            context_capacity:        100,
            context_ttl:             Duration::from_secs(24 * 3600),
            sweep_period:            Duration::from_secs(600),
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let poll_period = Duration::from_secs(env_or("POLL_INTERVAL_SECS", d.poll_period.as_secs()).max(1));
        let mut cycle_budget = Duration::from_secs(env_or("POLL_DEADLINE_SECS", d.cycle_budget.as_secs()));
        if cycle_budget.is_zero() || cycle_budget >= poll_period {
            cycle_budget = poll_period.mul_f64(0.9);
        }

        Self {
            tracked_players_key:     env_or("TRACKED_PLAYERS_KEY", d.tracked_players_key),
            poll_period,
            cycle_budget,
            rate_period:             Duration::from_millis(env_or("POLL_RATE_MS", d.rate_period.as_millis() as u64).max(1)),
            concurrency:             env_or("POLL_CONCURRENCY", d.concurrency).max(1),
            analyzer_timeout:        Duration::from_secs(env_or("ANALYZER_TIMEOUT_SECS", d.analyzer_timeout.as_secs()).max(1)),
            ledger_capacity:         env_or("LEDGER_CAPACITY", d.ledger_capacity).max(1),
            analysis_cache_capacity: env_or("ANALYSIS_CACHE_CAPACITY", d.analysis_cache_capacity).max(1),
            context_capacity:        env_or("CONTEXT_CAPACITY", d.context_capacity).max(1),
            context_ttl:             Duration::from_secs(env_or("CONTEXT_TTL_SECS", d.context_ttl.as_secs())),
            sweep_period:            Duration::from_secs(env_or("CONTEXT_SWEEP_SECS", d.sweep_period.as_secs()).max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_budget_inside_period() {
        let cfg = TrackerConfig::default();
        assert!(cfg.cycle_budget < cfg.poll_period);
        assert_eq!(cfg.concurrency, 5);
        assert_eq!(cfg.rate_period, Duration::from_millis(100));
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        env::set_var("RIFTWATCH_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("RIFTWATCH_TEST_ENV_OR", 7u64), 7);
        env::set_var("RIFTWATCH_TEST_ENV_OR", " 12 ");
        assert_eq!(env_or("RIFTWATCH_TEST_ENV_OR", 7u64), 12);
        env::remove_var("RIFTWATCH_TEST_ENV_OR");
    }
}
