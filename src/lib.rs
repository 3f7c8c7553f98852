//! Coffee Match - monthly coffee catchup pairing for small teams
//!
//! This library provides the matching algorithm that pairs members for
//! one-on-one catchups each cycle, along with the stores, report builder and
//! webhook notifier the monthly job runs on.

pub mod cli;
pub mod config;
pub mod core;
pub mod jobs;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use core::{Matcher, MatchError, MeetingHistory, UnfavourablePairs};
pub use models::{Member, MeetingRecord, ConfirmedMatch, MatchKind, RankingWeights};
