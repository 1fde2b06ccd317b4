//! In-process fakes for the collaborator traits.

use crate::collaborators::{Analyzer, DeliverySink, MatchApi, Notification, PlayerAnalysis};
use crate::error::TrackerError;
use async_trait::async_trait;
use match_pipeline::{MatchSummary, ParticipantRecord, Timeline, TransformedMatch};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const ROLES: [&str; 5] = ["TOP", "JUNGLE", "MIDDLE", "BOTTOM", "UTILITY"];

/// Ten players; `tracked` take the first blue-side slots.
pub fn five_v_five(match_id: &str, tracked: &[&str]) -> MatchSummary {
    let participants = (1..=10u32)
        .map(|slot| {
            let idx = (slot - 1) as usize;
            let puuid = tracked
                .get(idx)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("filler-{slot}"));
            ParticipantRecord {
                riot_id_game_name: format!("name-{puuid}"),
                puuid,
                participant_id: slot,
                champion_name: "Ahri".into(),
                team_id: if slot <= 5 { 100 } else { 200 },
                team_position: ROLES[idx % 5].into(),
                win: slot <= 5,
                kills: 3,
                deaths: 2,
                assists: 4,
                ..Default::default()
            }
        })
        .collect();
    MatchSummary {
        match_id: match_id.to_string(),
        duration_secs: 1_500,
        game_mode: "CLASSIC".into(),
        participants,
    }
}

#[derive(Default)]
pub struct FakeApi {
    latest:            Mutex<HashMap<String, Option<String>>>,
    matches:           Mutex<HashMap<String, MatchSummary>>,
    panic_for:         Mutex<HashSet<String>>,
    latest_delay:      Mutex<Duration>,
    failing_details:   AtomicBool,
    failing_timelines: AtomicBool,
    latest_calls:      AtomicUsize,
    details_calls:     AtomicUsize,
}

impl FakeApi {
    pub fn set_latest(&self, player_id: &str, match_id: Option<&str>) {
        self.latest.lock().insert(player_id.to_string(), match_id.map(str::to_string));
    }

    pub fn add_match(&self, summary: MatchSummary) {
        self.matches.lock().insert(summary.match_id.clone(), summary);
    }

    pub fn panic_on(&self, player_id: &str) {
        self.panic_for.lock().insert(player_id.to_string());
    }

    pub fn delay_latest(&self, delay: Duration) {
        *self.latest_delay.lock() = delay;
    }

    pub fn fail_details(&self, fail: bool) {
        self.failing_details.store(fail, Ordering::SeqCst);
    }

    pub fn fail_timelines(&self) {
        self.failing_timelines.store(true, Ordering::SeqCst);
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchApi for FakeApi {
    async fn latest_match_id(&self, player_id: &str) -> Result<Option<String>, TrackerError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_for.lock().contains(player_id) {
            panic!("fake api exploded for {player_id}");
        }
        let delay = *self.latest_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.latest
            .lock()
            .get(player_id)
            .cloned()
            .ok_or_else(|| TrackerError::UpstreamUnavailable(format!("no such player {player_id}")))
    }

    async fn match_details(&self, match_id: &str) -> Result<MatchSummary, TrackerError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_details.load(Ordering::SeqCst) {
            return Err(TrackerError::UpstreamUnavailable("503".into()));
        }
        self.matches
            .lock()
            .get(match_id)
            .cloned()
            .ok_or_else(|| TrackerError::UpstreamUnavailable(format!("404 {match_id}")))
    }

    async fn match_timeline(&self, _match_id: &str) -> Result<Timeline, TrackerError> {
        if self.failing_timelines.load(Ordering::SeqCst) {
            return Err(TrackerError::UpstreamUnavailable("503".into()));
        }
        Ok(Timeline::default())
    }
}

/// Returns one analysis per teammate after `delay`.
pub struct FixedAnalyzer {
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, transformed: &TransformedMatch) -> anyhow::Result<Vec<PlayerAnalysis>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(vec![PlayerAnalysis {
            champion:    "Ahri".into(),
            player_name: transformed.target_name.clone(),
            score:       7.0,
            ..Default::default()
        }])
    }
}

#[derive(Default)]
pub struct RecordingSink {
    sent:    Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("destination rejected the message");
        }
        let mut sent = self.sent.lock();
        sent.push(notification.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}
