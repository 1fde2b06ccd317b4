//! rift-watch — Match Tracker
//!
//! Polls tracked players for new matches, runs them through the pipeline and
//! hands one notification per (match, destination) to the delivery sink.

pub mod bounded_cache;
pub mod collaborators;
pub mod config;
pub mod deadline;
pub mod dedup;
pub mod error;
pub mod limiter;
pub mod rate_gate;
pub mod reply_context;
pub mod scheduler;
pub mod service;
pub mod targets;

#[cfg(test)]
mod testkit;

pub use bounded_cache::BoundedCache;
pub use collaborators::{
    AnalysisOutcome, Analyzer, DeliverySink, KeyValueStore, MatchApi, MemoryStore, Notification, PlayerAnalysis,
};
pub use config::{env_or, TrackerConfig};
pub use deadline::CycleDeadline;
pub use dedup::{ClaimRefused, LedgerClaim, NotificationLedger};
pub use error::{body_snippet, TrackerError};
pub use limiter::{ConcurrencyLimiter, SlotPermit};
pub use rate_gate::RateGate;
pub use reply_context::{ContextKind, ContextSweeper, ReplyContext, ReplyContextCache};
pub use scheduler::{CycleReport, PollContext, PollScheduler, SchedulerStatus, UnitOutcome};
pub use service::{AnalysisReport, CachedAnalysis, MatchService};
pub use targets::{TargetRegistry, TrackedTarget};
