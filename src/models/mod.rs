// Model exports
pub mod domain;

pub use domain::{
    Member, MeetingRecord, NewMeeting, MeetingOutcome, Location, Candidate, MatchKind,
    ConfirmedMatch, RankingWeights, pair_key, title_case,
};
