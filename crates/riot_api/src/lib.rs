//! rift-watch — Riot API
//!
//! match-v5 and account-v1 over HTTPS, exposed as a [`match_tracker::MatchApi`].

pub mod client;
pub mod dto;

pub use client::{RiotClient, RiotConfig, DEFAULT_ACCOUNT_BASE_URL, DEFAULT_MATCH_BASE_URL};
