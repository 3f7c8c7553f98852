//! Storage traits for members, meeting history and locations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Location, MeetingOutcome, MeetingRecord, Member, NewMeeting};

/// Errors that can occur when reading or writing catchup data
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Source of the members taking part this cycle
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// All active members, in a stable order
    async fn list_active_members(&self) -> StoreResult<Vec<Member>>;
}

/// Append-only record of catchups
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Every recorded meeting, for building a matching snapshot
    async fn all_meetings(&self) -> StoreResult<Vec<MeetingRecord>>;

    /// Every recorded meeting `member` took part in
    async fn meetings_involving(&self, member: Uuid) -> StoreResult<Vec<MeetingRecord>> {
        let meetings = self.all_meetings().await?;
        Ok(meetings.into_iter().filter(|m| m.involves(member)).collect())
    }

    /// Meetings dated in `[from, to)`, oldest first, with participants
    async fn meetings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<MeetingOutcome>>;

    /// A single meeting with participants, if it exists
    async fn get_meeting(&self, id: Uuid) -> StoreResult<Option<MeetingOutcome>>;

    /// Persist this cycle's matches, returning the stored records
    async fn record_meetings(&self, meetings: &[NewMeeting]) -> StoreResult<Vec<MeetingRecord>>;

    /// Mark a meeting as having happened, optionally at `venue_id`
    async fn record_submission(&self, meeting_id: Uuid, venue_id: Option<Uuid>) -> StoreResult<()>;
}

/// Places to suggest for catchups
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// A location drawn with `rng`, or `None` if there are none
    async fn random_location(&self, rng: &mut (dyn RngCore + Send)) -> StoreResult<Option<Location>>;
}

/// Combined storage trait
pub trait CoffeeStore: MembershipProvider + HistoryStore + LocationProvider + Send + Sync {}

impl<T> CoffeeStore for T where T: MembershipProvider + HistoryStore + LocationProvider + Send + Sync {}
