/// rift-watch — Logger
/// JSONL event stream (one file per UTC day)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone, Default)]
pub struct PollCycleEvent {
    pub ts:           String,
    pub event:        &'static str,   // "POLL_CYCLE"
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
    pub elapsed_ms:   u64,
}

#[derive(Serialize, Debug)]
pub struct MatchDetectedEvent {
    pub ts:             String,
    pub event:          &'static str,   // "MATCH_DETECTED"
    pub player:         String,
    pub destination:    String,
    pub previous_match: String,
    pub match_id:       String,
}

#[derive(Serialize, Debug)]
pub struct NotificationEvent {
    pub ts:          String,
    pub event:       &'static str,   // "NOTIFICATION_SENT" | "NOTIFICATION_DUPLICATE"
    pub match_id:    String,
    pub destination: String,
    pub players:     Vec<String>,
    pub analysis:    &'static str,   // "ready" | "unavailable" | "skipped"
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:      String,
    pub event:   &'static str,   // "API_STATUS"
    pub source:  String,
    pub scope:   String,
    pub ok:      bool,
    pub kind:    String,         // "unavailable" | "malformed" | "data_missing" | "ok"
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ContextSweepEvent {
    pub ts:        String,
    pub event:     &'static str,   // "CONTEXT_SWEEP"
    pub removed:   usize,
    pub remaining: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_event() {
        let dir = std::env::temp_dir().join(format!("rift-watch-logger-{}", std::process::id()));
        let logger = EventLogger::new(&dir);
        let ev = ContextSweepEvent { ts: now_iso(), event: "CONTEXT_SWEEP", removed: 2, remaining: 5 };
        logger.log(&ev).unwrap();
        logger.log(&ev).unwrap();

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let body = fs::read_to_string(dir.join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event\":\"CONTEXT_SWEEP\""));
        fs::remove_dir_all(&dir).ok();
    }
}
