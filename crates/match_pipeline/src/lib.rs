//! rift-watch — Match Pipeline
//!
//! Raw match + optional timeline → teammates, lane matchups and timeline
//! insights, ready for the analysis collaborator.

pub mod champions;
pub mod normalize;
pub mod timeline;
pub mod transform;
pub mod types;

pub use champions::ChampionCatalog;
pub use normalize::NormalizedPlayer;
pub use timeline::{derive_insights, DeathInfo, GoldDiff, KillInfo, ObjectiveKill, TimelineInsights};
pub use transform::{transform, LaneMatchup, MatchTransformer, TransformError, TransformedMatch};
pub use types::{
    EventKind, MatchSummary, ParticipantChallenges, ParticipantFrame, ParticipantRecord, Timeline,
    TimelineEvent, TimelineFrame,
};
