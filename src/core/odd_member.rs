use rand::Rng;

use crate::core::{error::MatchError, history::MeetingHistory};
use crate::models::Member;

/// Members eligible to host the odd one out
///
/// `taken` is sorted by overall catchup count (stable, so ties keep the order
/// members were matched in) and cut to indices `0..=taken.len() / 4`. That
/// inclusive bound means 2-3 matched members give a slice of one and 4-7
/// give two.
pub fn least_active_quartile<'a>(
    taken: &[&'a Member],
    history: &MeetingHistory,
) -> Result<Vec<&'a Member>, MatchError> {
    if taken.is_empty() {
        return Err(MatchError::NoOddMemberCandidates);
    }

    let mut by_activity = taken.to_vec();
    by_activity.sort_by_key(|member| history.activity_count(member));
    by_activity.truncate(taken.len() / 4 + 1);

    Ok(by_activity)
}

/// Pick a second partner for the unmatched member
///
/// Chooses uniformly from [`least_active_quartile`] so catchups go to people
/// who have had fewer of them, e.g. new staff.
pub fn pick_odd_partner<'a, R>(
    taken: &[&'a Member],
    history: &MeetingHistory,
    rng: &mut R,
) -> Result<&'a Member, MatchError>
where
    R: Rng + ?Sized,
{
    let quartile = least_active_quartile(taken, history)?;
    let index = rng.gen_range(0..quartile.len());

    tracing::debug!(
        "Odd member partner drawn from {} of {} matched members (index {})",
        quartile.len(),
        taken.len(),
        index
    );

    Ok(quartile[index])
}
