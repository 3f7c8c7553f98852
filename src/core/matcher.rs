use std::collections::HashSet;

use rand::Rng;
use uuid::Uuid;

use crate::core::{
    candidates::{distinct_members, generate_candidates},
    error::MatchError,
    history::MeetingHistory,
    odd_member::pick_odd_partner,
    ranking::{rank_pair, UnfavourablePairs},
};
use crate::models::{Candidate, ConfirmedMatch, MatchKind, Member, RankingWeights};

/// Result of the greedy pass
#[derive(Debug)]
pub struct GreedyResult<'a> {
    pub confirmed: Vec<Candidate<'a>>,
    /// Members in the order they were taken
    pub taken: Vec<&'a Member>,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Candidate generation (every unordered pair, ranked)
/// 2. Greedy confirmation in rank order
/// 3. Odd member resolution when one member is left over
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: RankingWeights,
    unfavourable: UnfavourablePairs,
}

impl Matcher {
    pub fn new(weights: RankingWeights, unfavourable: UnfavourablePairs) -> Self {
        Self { weights, unfavourable }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: RankingWeights::default(),
            unfavourable: UnfavourablePairs::default(),
        }
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    pub fn unfavourable(&self) -> &UnfavourablePairs {
        &self.unfavourable
    }

    /// Rank a single pair with this matcher's configuration
    pub fn rank(&self, a: &Member, b: &Member, history: &MeetingHistory) -> f64 {
        rank_pair(a, b, history, &self.unfavourable, &self.weights)
    }

    /// Compute this cycle's catchups
    ///
    /// Every member ends up in exactly one match, except that with an odd
    /// number of members one of them is in two. `rng` is only used to pick
    /// that member; everything else is a pure function of `members` and
    /// `history`.
    ///
    /// # Arguments
    /// * `members` - Active members; repeated ids are ignored
    /// * `history` - Snapshot of previous catchups
    /// * `rng` - Random source for the odd member pick
    ///
    /// # Returns
    /// Ranked matches in confirmation order, then the odd member match if any
    pub fn compute_matchups<R>(
        &self,
        members: &[Member],
        history: &MeetingHistory,
        rng: &mut R,
    ) -> Result<Vec<ConfirmedMatch>, MatchError>
    where
        R: Rng + ?Sized,
    {
        let members = distinct_members(members);
        if members.len() < 2 {
            return Err(MatchError::NotEnoughMembers { found: members.len() });
        }

        let candidates = generate_candidates(&members, history, &self.unfavourable, &self.weights);
        tracing::debug!("Generated {} candidates for {} members", candidates.len(), members.len());

        let GreedyResult { confirmed, taken } = greedy_match(candidates);

        let taken_ids: HashSet<Uuid> = taken.iter().map(|m| m.id).collect();
        let unmatched: Vec<&Member> = members
            .iter()
            .copied()
            .filter(|m| !taken_ids.contains(&m.id))
            .collect();

        let mut matches: Vec<ConfirmedMatch> = confirmed
            .into_iter()
            .map(|c| ConfirmedMatch {
                first: c.first.clone(),
                second: c.second.clone(),
                rank: c.rank,
                kind: MatchKind::Ranked,
            })
            .collect();

        // Every pair is a candidate, so the greedy pass leaves at most one member over
        debug_assert!(unmatched.len() <= 1, "{} members left unmatched", unmatched.len());
        if let Some(last) = unmatched.first() {
            let partner = pick_odd_partner(&taken, history, rng)?;
            tracing::info!(
                "Odd member {} gets a catchup with {}, who has two this cycle",
                last.id,
                partner.id
            );
            matches.push(ConfirmedMatch {
                first: (*last).clone(),
                second: partner.clone(),
                rank: self.rank(last, partner, history),
                kind: MatchKind::OddMember,
            });
        }

        tracing::info!("Confirmed {} catchups for {} members", matches.len(), members.len());
        Ok(matches)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Confirm non-conflicting candidates in descending rank order
///
/// The sort is stable, so equal ranks keep generation order and the outcome
/// is deterministic. This is greedy, not a maximum weight matching: one high
/// ranked pair may block two lower ranked pairs that together score more.
pub fn greedy_match(mut candidates: Vec<Candidate<'_>>) -> GreedyResult<'_> {
    candidates.sort_by(|a, b| b.rank.total_cmp(&a.rank));

    let mut taken_ids: HashSet<Uuid> = HashSet::new();
    let mut taken = Vec::new();
    let mut confirmed = Vec::new();

    for candidate in candidates {
        if taken_ids.contains(&candidate.first.id) || taken_ids.contains(&candidate.second.id) {
            continue;
        }

        taken_ids.insert(candidate.first.id);
        taken_ids.insert(candidate.second.id);
        taken.push(candidate.first);
        taken.push(candidate.second);

        tracing::debug!(
            "Confirmed {} & {} (rank {})",
            candidate.first.first_name,
            candidate.second.first_name,
            candidate.rank
        );
        confirmed.push(candidate);
    }

    GreedyResult { confirmed, taken }
}
