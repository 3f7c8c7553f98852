// Core algorithm exports
pub mod candidates;
pub mod error;
pub mod history;
pub mod matcher;
pub mod odd_member;
pub mod ranking;

pub use candidates::{distinct_members, generate_candidates};
pub use error::MatchError;
pub use history::{DataInconsistency, MeetingHistory, DAYS_PER_MONTH, NEVER_MET_MONTHS};
pub use matcher::{greedy_match, GreedyResult, Matcher};
pub use odd_member::{least_active_quartile, pick_odd_partner};
pub use ranking::{rank_pair, UnfavourablePairs};
