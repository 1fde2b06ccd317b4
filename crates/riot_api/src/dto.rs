//! match-v5 / account-v1 response envelopes.

use match_pipeline::{MatchSummary, ParticipantRecord, Timeline, TimelineFrame};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MatchDto {
    pub metadata: MatchMetadata,
    pub info:     MatchInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub match_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    /// Seconds
    pub game_duration: i64,
    #[serde(default)]
    pub game_mode:     String,
    #[serde(default)]
    pub participants:  Vec<ParticipantRecord>,
}

impl From<MatchDto> for MatchSummary {
    fn from(dto: MatchDto) -> Self {
        MatchSummary {
            match_id:      dto.metadata.match_id,
            duration_secs: dto.info.game_duration,
            game_mode:     dto.info.game_mode,
            participants:  dto.info.participants,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimelineDto {
    pub info: TimelineInfo,
}

#[derive(Debug, Deserialize)]
pub struct TimelineInfo {
    #[serde(default)]
    pub frames: Vec<TimelineFrame>,
}

impl From<TimelineDto> for Timeline {
    fn from(dto: TimelineDto) -> Self {
        Timeline { frames: dto.info.frames }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid:     String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub tag_line:  String,
}
