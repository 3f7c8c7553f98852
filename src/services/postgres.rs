use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use super::store::*;
use crate::config::DatabaseSettings;
use crate::models::{Location, MeetingOutcome, MeetingRecord, Member, NewMeeting};

const OUTCOME_SELECT: &str = r#"
    SELECT
        m.id, m.member_a, m.member_b, m.date, m.created_at, m.venue_id,
        a.first_name AS a_first_name, a.last_name AS a_last_name, a.is_active AS a_is_active,
        b.first_name AS b_first_name, b.last_name AS b_last_name, b.is_active AS b_is_active,
        l.title AS venue_title,
        EXISTS (SELECT 1 FROM submissions s WHERE s.meeting_id = m.id) AS completed
    FROM meetings m
    JOIN members a ON a.id = m.member_a
    JOIN members b ON b.id = m.member_b
    LEFT JOIN locations l ON l.id = m.venue_id
"#;

/// PostgreSQL client for members, meeting history and locations
///
/// This is the system of record the monthly job reads its snapshot from and
/// writes new meetings back to once matching has finished.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(5),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn meeting_from_row(row: &PgRow) -> Result<MeetingRecord, sqlx::Error> {
    Ok(MeetingRecord {
        id: row.try_get("id")?,
        member_a: row.try_get("member_a")?,
        member_b: row.try_get("member_b")?,
        date: row.try_get("date")?,
        created_at: row.try_get("created_at")?,
        venue_id: row.try_get("venue_id")?,
    })
}

fn outcome_from_row(row: &PgRow) -> Result<MeetingOutcome, sqlx::Error> {
    let meeting = meeting_from_row(row)?;
    let venue = match (meeting.venue_id, row.try_get::<Option<String>, _>("venue_title")?) {
        (Some(id), Some(title)) => Some(Location { id, title }),
        _ => None,
    };

    Ok(MeetingOutcome {
        first: Member {
            id: meeting.member_a,
            first_name: row.try_get("a_first_name")?,
            last_name: row.try_get("a_last_name")?,
            is_active: row.try_get("a_is_active")?,
        },
        second: Member {
            id: meeting.member_b,
            first_name: row.try_get("b_first_name")?,
            last_name: row.try_get("b_last_name")?,
            is_active: row.try_get("b_is_active")?,
        },
        completed: row.try_get("completed")?,
        venue,
        meeting,
    })
}

#[async_trait]
impl MembershipProvider for PostgresClient {
    async fn list_active_members(&self) -> StoreResult<Vec<Member>> {
        let query = r#"
            SELECT id, first_name, last_name, is_active
            FROM members
            WHERE is_active
            ORDER BY created_at, id
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let members = rows
            .iter()
            .map(|row| {
                Ok(Member {
                    id: row.try_get("id")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    is_active: row.try_get("is_active")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        tracing::debug!("Loaded {} active members", members.len());
        Ok(members)
    }
}

#[async_trait]
impl HistoryStore for PostgresClient {
    async fn all_meetings(&self) -> StoreResult<Vec<MeetingRecord>> {
        let query = r#"
            SELECT id, member_a, member_b, date, created_at, venue_id
            FROM meetings
            ORDER BY date, created_at
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        let meetings = rows
            .iter()
            .map(meeting_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} meeting records", meetings.len());
        Ok(meetings)
    }

    async fn meetings_involving(&self, member: Uuid) -> StoreResult<Vec<MeetingRecord>> {
        let query = r#"
            SELECT id, member_a, member_b, date, created_at, venue_id
            FROM meetings
            WHERE member_a = $1 OR member_b = $1
            ORDER BY date, created_at
        "#;

        let rows = sqlx::query(query).bind(member).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(meeting_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn meetings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<MeetingOutcome>> {
        let query = format!(
            "{} WHERE m.date >= $1 AND m.date < $2 ORDER BY m.date, m.created_at",
            OUTCOME_SELECT
        );

        let rows = sqlx::query(&query)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(outcome_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_meeting(&self, id: Uuid) -> StoreResult<Option<MeetingOutcome>> {
        let query = format!("{} WHERE m.id = $1", OUTCOME_SELECT);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(outcome_from_row).transpose()?)
    }

    async fn record_meetings(&self, meetings: &[NewMeeting]) -> StoreResult<Vec<MeetingRecord>> {
        let query = r#"
            INSERT INTO meetings (id, member_a, member_b, date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, member_a, member_b, date, created_at, venue_id
        "#;

        // All or nothing: a half-written cycle would skew the next ranking
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(meetings.len());

        for meeting in meetings {
            let row = sqlx::query(query)
                .bind(Uuid::new_v4())
                .bind(meeting.member_a)
                .bind(meeting.member_b)
                .bind(meeting.date)
                .fetch_one(&mut *tx)
                .await?;
            records.push(meeting_from_row(&row)?);
        }

        tx.commit().await?;

        tracing::info!("Recorded {} meetings", records.len());
        Ok(records)
    }

    async fn record_submission(&self, meeting_id: Uuid, venue_id: Option<Uuid>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE meetings SET venue_id = COALESCE($2, venue_id) WHERE id = $1",
        )
        .bind(meeting_id)
        .bind(venue_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Meeting {}", meeting_id)));
        }

        sqlx::query("INSERT INTO submissions (id, meeting_id, venue_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(meeting_id)
            .bind(venue_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Recorded submission for meeting {}", meeting_id);
        Ok(())
    }
}

#[async_trait]
impl LocationProvider for PostgresClient {
    async fn random_location(&self, rng: &mut (dyn RngCore + Send)) -> StoreResult<Option<Location>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        if count == 0 {
            return Ok(None);
        }

        let offset = rng.gen_range(0..count);
        let row = sqlx::query("SELECT id, title FROM locations ORDER BY id OFFSET $1 LIMIT 1")
            .bind(offset)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|row| -> Result<Location, sqlx::Error> {
                Ok(Location {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                })
            })
            .transpose()?)
    }
}
