//! Raw upstream shapes: a finished match and its event timeline.
//!
//! Field names follow the Riot match-v5 JSON so participant and timeline
//! records deserialize straight from the API body.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Match ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id:      String,
    pub duration_secs: i64,
    pub game_mode:     String,
    pub participants:  Vec<ParticipantRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantRecord {
    pub puuid:                 String,
    /// Slot 1..=10, the key used by timeline events
    pub participant_id:        u32,
    pub riot_id_game_name:     String,
    pub champion_name:         String,
    pub team_id:               u32,
    /// "TOP" | "JUNGLE" | "MIDDLE" | "BOTTOM" | "UTILITY" (empty in some modes)
    pub team_position:         String,
    pub individual_position:   String,
    pub win:                   bool,

    pub kills:                 u32,
    pub deaths:                u32,
    pub assists:               u32,
    pub champ_level:           u32,
    pub largest_killing_spree: u32,
    pub total_time_spent_dead: u32,

    pub total_damage_dealt_to_champions: u64,
    pub total_damage_taken:              u64,
    pub damage_self_mitigated:           u64,
    #[serde(rename = "timeCCingOthers")]
    pub time_ccing_others:               u64,
    pub damage_dealt_to_objectives:      u64,

    pub total_minions_killed:   u32,
    pub neutral_minions_killed: u32,
    pub gold_earned:            u64,

    pub vision_score: u32,
    pub wards_placed: u32,
    pub wards_killed: u32,

    /// Detailed stat block, missing for some queues and older matches
    pub challenges: Option<ParticipantChallenges>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantChallenges {
    pub solo_kills:                    u32,
    pub lane_minions_first_10_minutes: u32,
    pub dragon_takedowns:              u32,
    pub baron_takedowns:               u32,
    pub turret_takedowns:              u32,
    pub control_wards_placed:          u32,
}

// ── Timeline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub frames: Vec<TimelineFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineFrame {
    /// Milliseconds since game start
    pub timestamp:          i64,
    pub events:             Vec<TimelineEvent>,
    /// Keyed by participant slot as a string ("1".."10")
    pub participant_frames: HashMap<String, ParticipantFrame>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ChampionKill,
    EliteMonsterKill,
    TurretPlateDestroyed,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub kind:                      EventKind,
    pub timestamp:                 i64,
    pub killer_id:                 u32,
    pub victim_id:                 u32,
    pub assisting_participant_ids: Vec<u32>,
    pub bounty:                    u32,
    pub shutdown_bounty:           u32,
    pub kill_streak_length:        u32,
    pub monster_type:              String,
    pub monster_sub_type:          String,
    pub lane_type:                 String,
    /// For plate events: the team that owned the destroyed plate
    pub team_id:                   u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantFrame {
    pub participant_id:        u32,
    pub total_gold:            u64,
    pub minions_killed:        u32,
    pub jungle_minions_killed: u32,
}
