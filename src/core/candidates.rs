use std::collections::HashSet;

use uuid::Uuid;

use crate::core::{history::MeetingHistory, ranking::{rank_pair, UnfavourablePairs}};
use crate::models::{Candidate, Member, RankingWeights};

/// Drop repeated member ids, keeping the first occurrence and input order
pub fn distinct_members(members: &[Member]) -> Vec<&Member> {
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(members.len());
    members
        .iter()
        .filter(|member| {
            let fresh = seen.insert(member.id);
            if !fresh {
                tracing::warn!("Member {} listed more than once, ignoring repeat", member.id);
            }
            fresh
        })
        .collect()
}

/// Enumerate every unordered pair of `members` once, with its rank
///
/// Pairs come out in input order (`(0,1), (0,2), .., (1,2), ..`), which is
/// the baseline the matcher's stable sort falls back on for equal ranks.
pub fn generate_candidates<'a>(
    members: &[&'a Member],
    history: &MeetingHistory,
    unfavourable: &UnfavourablePairs,
    weights: &RankingWeights,
) -> Vec<Candidate<'a>> {
    let n = members.len();
    let mut candidates = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for (i, &first) in members.iter().enumerate() {
        for &second in &members[i + 1..] {
            let rank = rank_pair(first, second, history, unfavourable, weights);
            candidates.push(Candidate { first, second, rank });
        }
    }

    candidates
}
