use thiserror::Error;

/// Fatal problems with the member population for a matching run
///
/// No partial list of matches is ever returned alongside these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Configuration error: at least 2 active members are needed, found {found}")]
    NotEnoughMembers { found: usize },

    #[error("Configuration error: no matched members available to pair the odd member with")]
    NoOddMemberCandidates,
}
