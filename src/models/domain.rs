use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person taking part in the monthly coffee catchups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
}

impl Member {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            is_active: true,
        }
    }

    /// First name as it appears in reports ("hugh" -> "Hugh")
    pub fn display_name(&self) -> String {
        title_case(&self.first_name)
    }
}

fn default_true() -> bool { true }

/// Upper-case the first letter of every word, lower-case the rest
pub fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A past (or freshly scheduled) catchup between two members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: Uuid,
    #[serde(rename = "memberA")]
    pub member_a: Uuid,
    #[serde(rename = "memberB")]
    pub member_b: Uuid,
    pub date: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "venueId", default)]
    pub venue_id: Option<Uuid>,
}

impl MeetingRecord {
    /// Whether this record involves `member`
    #[inline]
    pub fn involves(&self, member: Uuid) -> bool {
        self.member_a == member || self.member_b == member
    }
}

/// A meeting waiting to be written to the history store
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeeting {
    pub member_a: Uuid,
    pub member_b: Uuid,
    pub date: DateTime<Utc>,
}

/// A meeting joined with its participants and completion status
#[derive(Debug, Clone)]
pub struct MeetingOutcome {
    pub meeting: MeetingRecord,
    pub first: Member,
    pub second: Member,
    /// At least one submission was recorded for the meeting
    pub completed: bool,
    pub venue: Option<Location>,
}

/// A cafe or other spot suggested for catchups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub title: String,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// A scored, unconfirmed pairing for the current cycle
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub first: &'a Member,
    pub second: &'a Member,
    pub rank: f64,
}

/// How a confirmed match came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Confirmed by the greedy pass in rank order
    Ranked,
    /// Second catchup given to a member so the odd one out is not left alone
    OddMember,
}

/// A finalized pairing for the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedMatch {
    pub first: Member,
    pub second: Member,
    pub rank: f64,
    pub kind: MatchKind,
}

impl ConfirmedMatch {
    pub fn involves(&self, member: Uuid) -> bool {
        self.first.id == member || self.second.id == member
    }

    /// Unordered pair key, smaller id first
    pub fn pair_key(&self) -> (Uuid, Uuid) {
        pair_key(self.first.id, self.second.id)
    }

    pub fn is_odd_member(&self) -> bool {
        self.kind == MatchKind::OddMember
    }

    pub fn to_new_meeting(&self, date: DateTime<Utc>) -> NewMeeting {
        NewMeeting {
            member_a: self.first.id,
            member_b: self.second.id,
            date,
        }
    }
}

/// Canonical key for an unordered member pair
#[inline]
pub fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Ranking coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Subtracted once per previous catchup of the pair
    pub meeting_count: f64,
    /// Months reported for pairs that have never met
    pub never_met_months: i64,
    /// Subtracted when the pair is on the unfavourable list
    pub unfavourable_penalty: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            meeting_count: 0.75,
            never_met_months: crate::core::history::NEVER_MET_MONTHS,
            unfavourable_penalty: 3.0,
        }
    }
}
