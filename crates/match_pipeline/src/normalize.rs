//! Per-player stat normalization.
//!
//! Every derived metric comes from the raw counters through one fixed formula
//! and is rounded to a fixed precision, so equal inputs always serialize
//! to equal output.

use crate::champions::ChampionCatalog;
use crate::types::ParticipantRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPlayer {
    pub player_id:           String,
    pub name:                String,
    pub champion_name:       String,
    pub champion_tags:       Vec<String>,
    pub champion_defense:    u32,
    pub team_position:       String,
    pub individual_position: String,
    pub win:                 bool,

    // combat
    pub kills:                 u32,
    pub deaths:                u32,
    pub assists:               u32,
    pub kda:                   f64,
    pub kill_participation:    f64,   // %
    pub takedowns:             u32,
    pub largest_killing_spree: u32,
    pub solo_kills:            u32,
    pub time_spent_dead:       u32,

    // damage
    pub total_damage_dealt_to_champions: u64,
    pub damage_per_minute:               f64,
    pub team_damage_percentage:          f64,   // %
    pub time_ccing_others:               u64,
    pub total_damage_taken:              u64,
    pub damage_taken_share:              f64,   // %
    pub damage_self_mitigated:           u64,

    // economy
    pub lane_minions_first_10_min: u32,
    pub total_cs:                  u32,
    pub cs_per_minute:             f64,
    pub gold_earned:               u64,
    pub gold_per_minute:           f64,
    pub champ_level:               u32,

    // objectives
    pub dragon_takedowns:           u32,
    pub baron_takedowns:            u32,
    pub damage_dealt_to_objectives: u64,
    pub turret_takedowns:           u32,

    // vision
    pub vision_score:            u32,
    pub vision_score_per_minute: f64,
    pub wards_placed:            u32,
    pub control_wards_placed:    u32,
    pub wards_killed:            u32,
}

/// Sums over one team, used as denominators for the share metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamTotals {
    pub kills:        u32,
    pub damage_dealt: u64,
    pub damage_taken: u64,
}

impl TeamTotals {
    pub fn for_team(participants: &[ParticipantRecord], team_id: u32) -> Self {
        participants
            .iter()
            .filter(|p| p.team_id == team_id)
            .fold(Self::default(), |acc, p| Self {
                kills:        acc.kills + p.kills,
                damage_dealt: acc.damage_dealt + p.total_damage_dealt_to_champions,
                damage_taken: acc.damage_taken + p.total_damage_taken,
            })
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    round_to(part / whole * 100.0, 1)
}

/// `minutes` must already be clamped to a nonzero value.
pub fn normalize_player(
    p:       &ParticipantRecord,
    minutes: f64,
    team:    &TeamTotals,
    catalog: &ChampionCatalog,
) -> NormalizedPlayer {
    let (champion_tags, champion_defense) = catalog.lookup(&p.champion_name);
    let ch = p.challenges.clone().unwrap_or_default();
    let total_cs = p.total_minions_killed + p.neutral_minions_killed;
    let takedowns = p.kills + p.assists;

    NormalizedPlayer {
        player_id:           p.puuid.clone(),
        name:                p.riot_id_game_name.clone(),
        champion_name:       p.champion_name.clone(),
        champion_tags,
        champion_defense,
        team_position:       p.team_position.clone(),
        individual_position: p.individual_position.clone(),
        win:                 p.win,

        kills:                 p.kills,
        deaths:                p.deaths,
        assists:               p.assists,
        kda:                   round_to(takedowns as f64 / p.deaths.max(1) as f64, 2),
        kill_participation:    percent(takedowns as f64, team.kills as f64),
        takedowns,
        largest_killing_spree: p.largest_killing_spree,
        solo_kills:            ch.solo_kills,
        time_spent_dead:       p.total_time_spent_dead,

        total_damage_dealt_to_champions: p.total_damage_dealt_to_champions,
        damage_per_minute:               round_to(p.total_damage_dealt_to_champions as f64 / minutes, 0),
        team_damage_percentage:          percent(p.total_damage_dealt_to_champions as f64, team.damage_dealt as f64),
        time_ccing_others:               p.time_ccing_others,
        total_damage_taken:              p.total_damage_taken,
        damage_taken_share:              percent(p.total_damage_taken as f64, team.damage_taken as f64),
        damage_self_mitigated:           p.damage_self_mitigated,

        lane_minions_first_10_min: ch.lane_minions_first_10_minutes,
        total_cs,
        cs_per_minute:             round_to(total_cs as f64 / minutes, 1),
        gold_earned:               p.gold_earned,
        gold_per_minute:           round_to(p.gold_earned as f64 / minutes, 0),
        champ_level:               p.champ_level,

        dragon_takedowns:           ch.dragon_takedowns,
        baron_takedowns:            ch.baron_takedowns,
        damage_dealt_to_objectives: p.damage_dealt_to_objectives,
        turret_takedowns:           ch.turret_takedowns,

        vision_score:            p.vision_score,
        vision_score_per_minute: round_to(p.vision_score as f64 / minutes, 2),
        wards_placed:            p.wards_placed,
        control_wards_placed:    ch.control_wards_placed,
        wards_killed:            p.wards_killed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ParticipantRecord {
        ParticipantRecord {
            puuid: "p1".into(),
            riot_id_game_name: "Mid Laner".into(),
            champion_name: "Zoe".into(),
            team_id: 100,
            kills: 6,
            deaths: 0,
            assists: 4,
            total_damage_dealt_to_champions: 25_000,
            total_damage_taken: 9_000,
            total_minions_killed: 200,
            neutral_minions_killed: 10,
            gold_earned: 12_345,
            vision_score: 31,
            ..Default::default()
        }
    }

    #[test]
    fn derived_metrics_use_fixed_formulas() {
        let team = TeamTotals { kills: 20, damage_dealt: 100_000, damage_taken: 60_000 };
        let n = normalize_player(&record(), 30.0, &team, &ChampionCatalog::empty());

        assert_eq!(n.total_cs, 210);
        assert_eq!(n.cs_per_minute, 7.0);
        assert_eq!(n.damage_per_minute, 833.0);
        assert_eq!(n.gold_per_minute, 412.0);
        assert_eq!(n.kill_participation, 50.0);
        assert_eq!(n.team_damage_percentage, 25.0);
        assert_eq!(n.damage_taken_share, 15.0);
        // zero deaths divides by one
        assert_eq!(n.kda, 10.0);
        assert_eq!(n.vision_score_per_minute, 1.03);
        assert_eq!(n.champion_defense, crate::champions::DEFAULT_DEFENSE);
        assert_eq!(n.solo_kills, 0);
    }

    #[test]
    fn team_without_kills_reports_zero_participation() {
        let team = TeamTotals::default();
        let n = normalize_player(&record(), 1.0, &team, &ChampionCatalog::empty());
        assert_eq!(n.kill_participation, 0.0);
        assert_eq!(n.damage_taken_share, 0.0);
    }

    #[test]
    fn team_totals_only_count_one_side() {
        let mut enemy = record();
        enemy.team_id = 200;
        enemy.kills = 50;
        let totals = TeamTotals::for_team(&[record(), record(), enemy], 100);
        assert_eq!(totals.kills, 12);
        assert_eq!(totals.damage_taken, 18_000);
    }
}
