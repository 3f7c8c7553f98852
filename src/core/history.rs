use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{pair_key, Member, MeetingRecord};

/// Days counted as one month when measuring time since the last catchup
pub const DAYS_PER_MONTH: i64 = 30;

/// Months reported for a pair that has never met
pub const NEVER_MET_MONTHS: i64 = 12;

/// History records that cannot take part in ranking
///
/// These are reported and skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataInconsistency {
    #[error("meeting {meeting_id} references member {member_id} who is not active")]
    UnknownMember { meeting_id: Uuid, member_id: Uuid },

    #[error("meeting {meeting_id} pairs member {member_id} with themself")]
    SelfMeeting { meeting_id: Uuid, member_id: Uuid },
}

/// Aggregate over all records of one pair
#[derive(Debug, Clone, Copy)]
struct PairHistory {
    count: u32,
    last_met: DateTime<Utc>,
}

/// Frozen snapshot of meeting history for one matching run
///
/// Answers "how often" and "how long ago" for any pair of active members
/// without further I/O. The record `date` is the one timestamp used for both
/// picking the most recent meeting and measuring the gap to `now`.
#[derive(Debug, Clone)]
pub struct MeetingHistory {
    pairs: HashMap<(Uuid, Uuid), PairHistory>,
    activity: HashMap<Uuid, u32>,
    issues: Vec<DataInconsistency>,
    now: DateTime<Utc>,
}

impl MeetingHistory {
    /// Build a snapshot from raw records, keeping only pairs of `members`
    pub fn new(members: &[Member], records: &[MeetingRecord], now: DateTime<Utc>) -> Self {
        let active: HashSet<Uuid> = members.iter().map(|m| m.id).collect();

        let mut pairs: HashMap<(Uuid, Uuid), PairHistory> = HashMap::new();
        let mut activity: HashMap<Uuid, u32> = HashMap::new();
        let mut issues = Vec::new();

        for record in records {
            if record.member_a == record.member_b {
                issues.push(DataInconsistency::SelfMeeting {
                    meeting_id: record.id,
                    member_id: record.member_a,
                });
                continue;
            }

            // Activity counts catchups with anyone, including former members
            for id in [record.member_a, record.member_b] {
                if active.contains(&id) {
                    *activity.entry(id).or_insert(0) += 1;
                }
            }

            let stale = [record.member_a, record.member_b]
                .into_iter()
                .find(|id| !active.contains(id));
            if let Some(member_id) = stale {
                issues.push(DataInconsistency::UnknownMember {
                    meeting_id: record.id,
                    member_id,
                });
                continue;
            }

            pairs
                .entry(pair_key(record.member_a, record.member_b))
                .and_modify(|pair| {
                    pair.count += 1;
                    if record.date > pair.last_met {
                        pair.last_met = record.date;
                    }
                })
                .or_insert(PairHistory {
                    count: 1,
                    last_met: record.date,
                });
        }

        for issue in &issues {
            tracing::warn!("Ignoring meeting record for ranking: {}", issue);
        }

        tracing::debug!(
            "Built meeting history: {} records, {} pairs, {} ignored",
            records.len(),
            pairs.len(),
            issues.len()
        );

        Self {
            pairs,
            activity,
            issues,
            now,
        }
    }

    /// An empty history, as for a brand new group
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self::new(&[], &[], now)
    }

    /// Number of previous catchups between `a` and `b`
    pub fn meeting_count(&self, a: &Member, b: &Member) -> u32 {
        self.pairs
            .get(&pair_key(a.id, b.id))
            .map(|pair| pair.count)
            .unwrap_or(0)
    }

    /// Whole months (of 30 days) since `a` and `b` last met, `None` if never
    pub fn months_since(&self, a: &Member, b: &Member) -> Option<i64> {
        self.pairs.get(&pair_key(a.id, b.id)).map(|pair| {
            let days = (self.now - pair.last_met).num_days().max(0);
            days / DAYS_PER_MONTH
        })
    }

    /// Like [`months_since`](Self::months_since) but pairs that never met
    /// report [`NEVER_MET_MONTHS`]
    pub fn months_since_last_meeting(&self, a: &Member, b: &Member) -> i64 {
        self.months_since(a, b).unwrap_or(NEVER_MET_MONTHS)
    }

    /// Total catchups `member` has had with anyone
    pub fn activity_count(&self, member: &Member) -> u32 {
        self.activity.get(&member.id).copied().unwrap_or(0)
    }

    /// Records skipped while building the snapshot
    pub fn issues(&self) -> &[DataInconsistency] {
        &self.issues
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(a: &Member, b: &Member, date: DateTime<Utc>) -> MeetingRecord {
        MeetingRecord {
            id: Uuid::new_v4(),
            member_a: a.id,
            member_b: b.id,
            date,
            created_at: date,
            venue_id: None,
        }
    }

    #[test]
    fn test_never_met_sentinel() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let history = MeetingHistory::new(&[a.clone(), b.clone()], &[], Utc::now());

        assert_eq!(history.meeting_count(&a, &b), 0);
        assert_eq!(history.months_since_last_meeting(&a, &b), 12);
    }

    #[test]
    fn test_count_is_symmetric() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let now = Utc::now();
        let records = vec![record(&a, &b, now), record(&b, &a, now)];
        let history = MeetingHistory::new(&[a.clone(), b.clone()], &records, now);

        assert_eq!(history.meeting_count(&a, &b), 2);
        assert_eq!(history.meeting_count(&b, &a), 2);
    }

    #[test]
    fn test_months_use_most_recent_date() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let now = Utc::now();
        let records = vec![
            record(&a, &b, now - Duration::days(200)),
            record(&a, &b, now - Duration::days(65)),
            record(&a, &b, now - Duration::days(120)),
        ];
        let history = MeetingHistory::new(&[a.clone(), b.clone()], &records, now);

        assert_eq!(history.months_since_last_meeting(&a, &b), 2);
    }

    #[test]
    fn test_months_floor_division() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let now = Utc::now();

        let history = MeetingHistory::new(
            &[a.clone(), b.clone()],
            &[record(&a, &b, now - Duration::days(29))],
            now,
        );
        assert_eq!(history.months_since_last_meeting(&a, &b), 0);

        let history = MeetingHistory::new(
            &[a.clone(), b.clone()],
            &[record(&a, &b, now - Duration::days(30))],
            now,
        );
        assert_eq!(history.months_since_last_meeting(&a, &b), 1);
    }

    #[test]
    fn test_future_dated_meeting_counts_as_zero_months() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let now = Utc::now();
        let history = MeetingHistory::new(
            &[a.clone(), b.clone()],
            &[record(&a, &b, now + Duration::days(90))],
            now,
        );
        assert_eq!(history.months_since_last_meeting(&a, &b), 0);
    }

    #[test]
    fn test_stale_member_is_ignored_and_reported() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let gone = Member::new("gail", "g");
        let now = Utc::now();
        let records = vec![record(&a, &gone, now), record(&a, &b, now)];
        let history = MeetingHistory::new(&[a.clone(), b.clone()], &records, now);

        assert_eq!(history.meeting_count(&a, &gone), 0);
        assert_eq!(history.meeting_count(&a, &b), 1);
        // Still counts towards alice's overall activity
        assert_eq!(history.activity_count(&a), 2);
        assert_eq!(
            history.issues(),
            &[DataInconsistency::UnknownMember {
                meeting_id: records[0].id,
                member_id: gone.id,
            }]
        );
    }

    #[test]
    fn test_self_meeting_is_ignored() {
        let a = Member::new("alice", "a");
        let now = Utc::now();
        let history = MeetingHistory::new(&[a.clone()], &[record(&a, &a, now)], now);

        assert_eq!(history.activity_count(&a), 0);
        assert_eq!(history.issues().len(), 1);
    }

    #[test]
    fn test_activity_count_with_anyone() {
        let a = Member::new("alice", "a");
        let b = Member::new("bob", "b");
        let c = Member::new("carol", "c");
        let now = Utc::now();
        let records = vec![record(&a, &b, now), record(&a, &c, now), record(&b, &c, now)];
        let history = MeetingHistory::new(&[a.clone(), b.clone(), c.clone()], &records, now);

        assert_eq!(history.activity_count(&a), 2);
        assert_eq!(history.activity_count(&b), 2);
        assert_eq!(history.activity_count(&Member::new("dan", "d")), 0);
    }
}
