//! Timeline insight derivation.
//!
//! One chronological pass over the frames; frames and the events inside them
//! already arrive in game order, so nothing is re-sorted.

use crate::normalize::round_to;
use crate::types::{EventKind, ParticipantRecord, Timeline, TimelineEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Minutes at which cumulative gold is snapshotted.
pub const CHECKPOINT_MINUTES: [u32; 3] = [5, 10, 15];
/// A frame counts for a checkpoint when it is closer than this (minutes).
pub const CHECKPOINT_TOLERANCE_MIN: f64 = 0.5;
/// Kill timeline preview cap.
pub const KILL_PREVIEW_CAP: usize = 10;
/// Checkpoint used for the lane gold differential.
pub const GOLD_DIFF_MINUTE: u32 = 10;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillInfo {
    pub time_min:        f64,
    pub killer:          String,
    pub killer_id:       u32,
    pub victim:          String,
    pub victim_id:       u32,
    pub assists:         Vec<String>,
    pub bounty:          u32,
    pub shutdown_bounty: u32,
    pub kill_streak:     u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathInfo {
    pub time_min: f64,
    pub player:   String,
    pub position: String,
    pub killer:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveKill {
    pub time_min:         f64,
    pub monster_type:     String,
    pub monster_sub_type: String,
    pub killer:           String,
    pub killer_team:      u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldDiff {
    pub gold:          u64,
    pub opponent_gold: u64,
    pub diff:          i64,
    pub position:      String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineInsights {
    pub first_blood:             Option<KillInfo>,
    /// Every target-team death; `team_deaths_by_10min` is counted from it.
    pub deaths_timeline:         Vec<DeathInfo>,
    /// First `KILL_PREVIEW_CAP` target-team kills.
    pub kills_timeline:          Vec<KillInfo>,
    pub objective_kills:         Vec<ObjectiveKill>,
    pub turret_plates_destroyed: u32,
    pub turret_plates_lost:      u32,
    /// Teammate name → gold vs lane opponent at minute 10
    pub gold_diff_10min:         BTreeMap<String, GoldDiff>,
    pub team_deaths_by_10min:    usize,
}

struct Slot<'a> {
    name: &'a str,
    role: &'a str,
    team: u32,
}

/// checkpoint minute → participant slot → cumulative gold
type GoldSnapshots = BTreeMap<u32, BTreeMap<u32, u64>>;

fn event_minute(ev: &TimelineEvent) -> f64 {
    round_to(ev.timestamp as f64 / 1000.0 / 60.0, 1)
}

pub fn derive_insights(
    timeline:       &Timeline,
    target_id:      &str,
    target_team_id: u32,
    participants:   &[ParticipantRecord],
) -> TimelineInsights {
    let slots: HashMap<u32, Slot<'_>> = participants
        .iter()
        .map(|p| {
            (p.participant_id, Slot {
                name: p.riot_id_game_name.as_str(),
                role: p.team_position.as_str(),
                team: p.team_id,
            })
        })
        .collect();
    let name_of = |id: u32| slots.get(&id).map_or(UNKNOWN, |s| s.name).to_string();
    let team_of = |id: u32| slots.get(&id).map_or(0, |s| s.team);

    let mut snapshots: GoldSnapshots = BTreeMap::new();
    let mut first_blood: Option<KillInfo> = None;
    let mut deaths_timeline = Vec::new();
    let mut kills_timeline = Vec::new();
    let mut objective_kills = Vec::new();
    let mut plates_destroyed = 0u32;
    let mut plates_lost = 0u32;

    for frame in &timeline.frames {
        let frame_min = frame.timestamp as f64 / 1000.0 / 60.0;

        for checkpoint in CHECKPOINT_MINUTES {
            if (frame_min - checkpoint as f64).abs() >= CHECKPOINT_TOLERANCE_MIN {
                continue;
            }
            // first frame inside the tolerance wins
            snapshots.entry(checkpoint).or_insert_with(|| {
                frame
                    .participant_frames
                    .iter()
                    .map(|(key, pf)| {
                        let slot = if pf.participant_id != 0 {
                            pf.participant_id
                        } else {
                            key.parse().unwrap_or(0)
                        };
                        (slot, pf.total_gold)
                    })
                    .collect()
            });
        }

        for ev in &frame.events {
            match ev.kind {
                EventKind::ChampionKill => {
                    let kill = KillInfo {
                        time_min:        event_minute(ev),
                        killer:          name_of(ev.killer_id),
                        killer_id:       ev.killer_id,
                        victim:          name_of(ev.victim_id),
                        victim_id:       ev.victim_id,
                        assists:         ev.assisting_participant_ids.iter().map(|id| name_of(*id)).collect(),
                        bounty:          ev.bounty,
                        shutdown_bounty: ev.shutdown_bounty,
                        kill_streak:     ev.kill_streak_length,
                    };

                    if first_blood.is_none() {
                        first_blood = Some(kill.clone());
                    }

                    if team_of(ev.victim_id) == target_team_id {
                        deaths_timeline.push(DeathInfo {
                            time_min: kill.time_min,
                            player:   kill.victim.clone(),
                            position: slots.get(&ev.victim_id).map_or("", |s| s.role).to_string(),
                            killer:   kill.killer.clone(),
                        });
                    }

                    if team_of(ev.killer_id) == target_team_id && kills_timeline.len() < KILL_PREVIEW_CAP {
                        kills_timeline.push(kill);
                    }
                }
                EventKind::EliteMonsterKill => {
                    objective_kills.push(ObjectiveKill {
                        time_min:         event_minute(ev),
                        monster_type:     ev.monster_type.clone(),
                        monster_sub_type: ev.monster_sub_type.clone(),
                        killer:           name_of(ev.killer_id),
                        killer_team:      team_of(ev.killer_id),
                    });
                }
                EventKind::TurretPlateDestroyed => {
                    if ev.team_id == target_team_id {
                        plates_lost += 1;
                    } else {
                        plates_destroyed += 1;
                    }
                }
                EventKind::Other => {}
            }
        }
    }

    let gold_diff_10min = lane_gold_diffs(&snapshots, GOLD_DIFF_MINUTE, target_team_id, participants);
    let team_deaths_by_10min = deaths_timeline
        .iter()
        .filter(|d| d.time_min <= GOLD_DIFF_MINUTE as f64)
        .count();

    tracing::debug!(
        target = %target_id,
        deaths = deaths_timeline.len(),
        kills = kills_timeline.len(),
        objectives = objective_kills.len(),
        "timeline insights derived"
    );

    TimelineInsights {
        first_blood,
        deaths_timeline,
        kills_timeline,
        objective_kills,
        turret_plates_destroyed: plates_destroyed,
        turret_plates_lost:      plates_lost,
        gold_diff_10min,
        team_deaths_by_10min,
    }
}

/// Missing snapshot on either side omits the player instead of zero-filling.
fn lane_gold_diffs(
    snapshots:      &GoldSnapshots,
    minute:         u32,
    target_team_id: u32,
    participants:   &[ParticipantRecord],
) -> BTreeMap<String, GoldDiff> {
    let mut out = BTreeMap::new();
    let Some(gold) = snapshots.get(&minute) else {
        return out;
    };

    for p in participants.iter().filter(|p| p.team_id == target_team_id) {
        let Some(&player_gold) = gold.get(&p.participant_id) else {
            continue;
        };
        let opponent = participants
            .iter()
            .find(|o| o.team_id != target_team_id && o.team_position == p.team_position);
        let Some(opponent) = opponent else {
            continue;
        };
        let Some(&opponent_gold) = gold.get(&opponent.participant_id) else {
            continue;
        };

        out.insert(p.riot_id_game_name.clone(), GoldDiff {
            gold: player_gold,
            opponent_gold,
            diff: player_gold as i64 - opponent_gold as i64,
            position: p.team_position.clone(),
        });
    }
    out
}
