//! In-memory storage implementation

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, RngCore};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::*;
use crate::models::{Location, MeetingOutcome, MeetingRecord, Member, NewMeeting};

/// Snapshot of a whole store, as read from a TOML fixture file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub meetings: Vec<MeetingRecord>,
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Ids of meetings that have a submission
    #[serde(default)]
    pub completed: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct Inner {
    members: Vec<Member>,
    meetings: Vec<MeetingRecord>,
    locations: Vec<Location>,
    completed: HashSet<Uuid>,
}

/// In-memory storage for dry runs and testing
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        Self {
            inner: RwLock::new(Inner {
                members: fixture.members,
                meetings: fixture.meetings,
                locations: fixture.locations,
                completed: fixture.completed.into_iter().collect(),
            }),
        }
    }

    /// Load a fixture written in TOML
    pub fn from_fixture_toml(source: &str) -> StoreResult<Self> {
        let fixture: StoreFixture = toml::from_str(source)
            .map_err(|e| StoreError::InvalidInput(format!("Invalid fixture: {}", e)))?;
        Ok(Self::from_fixture(fixture))
    }

    pub async fn from_fixture_file<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::InvalidInput(format!("Cannot read fixture {}: {}", path.display(), e))
        })?;
        tracing::info!("Loaded fixture from {}", path.display());
        Self::from_fixture_toml(&source)
    }

    pub async fn add_member(&self, member: Member) {
        self.inner.write().await.members.push(member);
    }

    pub async fn add_location(&self, location: Location) {
        self.inner.write().await.locations.push(location);
    }

    /// Insert a historical meeting as-is
    pub async fn add_meeting(&self, meeting: MeetingRecord) {
        self.inner.write().await.meetings.push(meeting);
    }
}

impl Inner {
    /// Join a meeting with its participants and venue
    ///
    /// `None` when a participant is no longer stored, matching the inner join
    /// the PostgreSQL store uses.
    fn outcome(&self, meeting: &MeetingRecord) -> Option<MeetingOutcome> {
        let lookup = |id: Uuid| {
            let member = self.members.iter().find(|m| m.id == id).cloned();
            if member.is_none() {
                tracing::warn!("Skipping meeting {}: member {} is not stored", meeting.id, id);
            }
            member
        };

        Some(MeetingOutcome {
            meeting: meeting.clone(),
            first: lookup(meeting.member_a)?,
            second: lookup(meeting.member_b)?,
            completed: self.completed.contains(&meeting.id),
            venue: meeting
                .venue_id
                .and_then(|id| self.locations.iter().find(|l| l.id == id).cloned()),
        })
    }
}

#[async_trait]
impl MembershipProvider for InMemoryStore {
    async fn list_active_members(&self) -> StoreResult<Vec<Member>> {
        let inner = self.inner.read().await;
        Ok(inner.members.iter().filter(|m| m.is_active).cloned().collect())
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn all_meetings(&self) -> StoreResult<Vec<MeetingRecord>> {
        Ok(self.inner.read().await.meetings.clone())
    }

    async fn meetings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<MeetingOutcome>> {
        let inner = self.inner.read().await;
        let mut meetings: Vec<&MeetingRecord> = inner
            .meetings
            .iter()
            .filter(|m| m.date >= from && m.date < to)
            .collect();
        meetings.sort_by_key(|m| (m.date, m.created_at));

        Ok(meetings.into_iter().filter_map(|m| inner.outcome(m)).collect())
    }

    async fn get_meeting(&self, id: Uuid) -> StoreResult<Option<MeetingOutcome>> {
        let inner = self.inner.read().await;
        Ok(inner
            .meetings
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| inner.outcome(m)))
    }

    async fn record_meetings(&self, meetings: &[NewMeeting]) -> StoreResult<Vec<MeetingRecord>> {
        let mut inner = self.inner.write().await;
        let created_at = Utc::now();

        let records: Vec<MeetingRecord> = meetings
            .iter()
            .map(|m| MeetingRecord {
                id: Uuid::new_v4(),
                member_a: m.member_a,
                member_b: m.member_b,
                date: m.date,
                created_at,
                venue_id: None,
            })
            .collect();
        inner.meetings.extend(records.iter().cloned());

        tracing::debug!("Recorded {} meetings in memory", records.len());
        Ok(records)
    }

    async fn record_submission(&self, meeting_id: Uuid, venue_id: Option<Uuid>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let meeting = inner
            .meetings
            .iter_mut()
            .find(|m| m.id == meeting_id)
            .ok_or_else(|| StoreError::NotFound(format!("Meeting {}", meeting_id)))?;

        if venue_id.is_some() {
            meeting.venue_id = venue_id;
        }
        inner.completed.insert(meeting_id);
        Ok(())
    }
}

#[async_trait]
impl LocationProvider for InMemoryStore {
    async fn random_location(&self, rng: &mut (dyn RngCore + Send)) -> StoreResult<Option<Location>> {
        let inner = self.inner.read().await;
        Ok(inner.locations.choose(rng).cloned())
    }
}
