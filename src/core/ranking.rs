use std::collections::HashSet;

use crate::core::history::MeetingHistory;
use crate::models::{Member, RankingWeights};

/// Pairs of first names that get a ranking penalty
///
/// Names are lower-cased and sorted within each pair both when the set is
/// built and on every lookup, so `("Nathan", "hugh")` and `("hugh", "nathan")`
/// are the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnfavourablePairs {
    pairs: HashSet<[String; 2]>,
}

impl UnfavourablePairs {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(a, b)| normalize(a.as_ref(), b.as_ref()))
                .collect(),
        }
    }

    /// Whether the first names of `a` and `b` form a listed pair
    pub fn contains(&self, a: &Member, b: &Member) -> bool {
        self.contains_names(&a.first_name, &b.first_name)
    }

    pub fn contains_names(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&normalize(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[inline]
fn normalize(a: &str, b: &str) -> [String; 2] {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a <= b { [a, b] } else { [b, a] }
}

/// Calculate the priority of pairing `a` with `b` this cycle
///
/// Ranking formula:
/// rank = (
///     - meeting_count * 0.75       # Frequent pairs sink
///     + months_since_last_meeting  # Overdue pairs rise, never met = 12
///     - 3 if unfavourable          # Listed pairs sink further
/// )
///
/// Higher rank means the pair is considered earlier.
pub fn rank_pair(
    a: &Member,
    b: &Member,
    history: &MeetingHistory,
    unfavourable: &UnfavourablePairs,
    weights: &RankingWeights,
) -> f64 {
    let count = history.meeting_count(a, b) as f64;
    let months = history
        .months_since(a, b)
        .unwrap_or(weights.never_met_months) as f64;

    let mut rank = months - count * weights.meeting_count;
    if unfavourable.contains(a, b) {
        rank -= weights.unfavourable_penalty;
    }
    rank
}
