use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;
use uuid::Uuid;

use crate::core::{MatchError, Matcher, MeetingHistory};
use crate::models::{ConfirmedMatch, MeetingRecord, NewMeeting};
use crate::services::{
    report::previous_month_range, CoffeeStore, ReportBuilder, StoreError, WebhookClient,
    WebhookError,
};

/// Errors that abort a job
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Meeting {0} not found")]
    MeetingNotFound(Uuid),

    #[error("Meeting {0} has no submission yet")]
    NotCompleted(Uuid),

    #[error("Cannot work out the previous month for {0}")]
    InvalidDate(DateTime<Utc>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a cycle should treat its side effects
#[derive(Debug, Clone, Copy)]
pub struct CycleOptions {
    /// Compute and render only: nothing is written, nothing is posted
    pub dry_run: bool,
    /// Post the monthly message to the webhook
    pub notify: bool,
    /// Seed for the odd member pick and the suggested location, entropy when unset
    pub seed: Option<u64>,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            notify: true,
            seed: None,
        }
    }
}

/// What a cycle did
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub matches: Vec<ConfirmedMatch>,
    /// Meetings written to the store, empty on a dry run
    pub recorded: Vec<MeetingRecord>,
    pub message: String,
    pub posted: bool,
    /// History records skipped as inconsistent
    pub ignored_records: usize,
}

/// The monthly coffee job
///
/// Reads a snapshot of members and history, runs the matcher, then writes the
/// new meetings and announces them. Writes only happen after matching
/// succeeds, so a failed run leaves the store untouched.
pub struct MonthlyCycle {
    store: Arc<dyn CoffeeStore>,
    matcher: Matcher,
    reports: ReportBuilder,
    notifier: Option<WebhookClient>,
}

impl MonthlyCycle {
    pub fn new(
        store: Arc<dyn CoffeeStore>,
        matcher: Matcher,
        reports: ReportBuilder,
        notifier: Option<WebhookClient>,
    ) -> Self {
        Self {
            store,
            matcher,
            reports,
            notifier,
        }
    }

    /// Run one cycle as of `now`
    pub async fn run(&self, now: DateTime<Utc>, options: &CycleOptions) -> Result<CycleOutcome, JobError> {
        let members = self.store.list_active_members().await?;
        let records = self.store.all_meetings().await?;
        tracing::info!(
            "Starting coffee cycle: {} active members, {} past meetings",
            members.len(),
            records.len()
        );

        let history = MeetingHistory::new(&members, &records, now);
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let matches = self.matcher.compute_matchups(&members, &history, &mut rng)?;

        let (from, to) = previous_month_range(now).ok_or(JobError::InvalidDate(now))?;
        let previous = self.store.meetings_between(from, to).await?;

        let recorded = if options.dry_run {
            tracing::info!("Dry run: not recording {} meetings", matches.len());
            Vec::new()
        } else {
            let new_meetings: Vec<NewMeeting> =
                matches.iter().map(|m| m.to_new_meeting(now)).collect();
            self.store.record_meetings(&new_meetings).await?
        };

        let location = self.store.random_location(&mut rng).await?;
        let message = self
            .reports
            .monthly_message(now, &previous, &matches, location.as_ref());

        let posted = match (&self.notifier, options.notify && !options.dry_run) {
            (Some(notifier), true) => {
                notifier.post_message(&message).await?;
                tracing::info!("Posted monthly message");
                true
            }
            (None, true) => {
                tracing::warn!("No webhook configured, monthly message not posted");
                false
            }
            (_, false) => false,
        };

        Ok(CycleOutcome {
            matches,
            recorded,
            message,
            posted,
            ignored_records: history.issues().len(),
        })
    }

    /// Post the success message for a meeting that has been recorded as done
    pub async fn announce_success(&self, meeting_id: Uuid) -> Result<String, JobError> {
        let outcome = self
            .store
            .get_meeting(meeting_id)
            .await?
            .ok_or(JobError::MeetingNotFound(meeting_id))?;

        if !outcome.completed {
            return Err(JobError::NotCompleted(meeting_id));
        }

        let message = self.reports.success_message(&outcome);
        match &self.notifier {
            Some(notifier) => notifier.post_message(&message).await?,
            None => tracing::warn!("No webhook configured, success message not posted"),
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Member};
    use crate::services::{HistoryStore, InMemoryStore, MembershipProvider};
    use chrono::TimeZone;

    async fn store_with(names: &[&str]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for name in names {
            store.add_member(Member::new(*name, "test")).await;
        }
        store
    }

    fn cycle(store: Arc<InMemoryStore>) -> MonthlyCycle {
        MonthlyCycle::new(store, Matcher::default(), ReportBuilder::new("https://record", None), None)
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = store_with(&["a", "b", "c", "d"]).await;
        let job = cycle(store.clone());

        let options = CycleOptions { dry_run: true, ..CycleOptions::default() };
        let outcome = job.run(Utc::now(), &options).await.unwrap();

        assert_eq!(outcome.matches.len(), 2);
        assert!(outcome.recorded.is_empty());
        assert!(!outcome.posted);
        assert!(store.all_meetings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_records_meetings_dated_now() {
        let store = store_with(&["a", "b", "c", "d", "e"]).await;
        let job = cycle(store.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        let outcome = job
            .run(now, &CycleOptions { seed: Some(7), ..CycleOptions::default() })
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 3);
        let stored = store.all_meetings().await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|m| m.date == now));
        assert!(outcome.message.contains("COFFEE CATCHUPS for MARCH 2024"));
    }

    #[tokio::test]
    async fn test_not_enough_members_aborts() {
        let store = store_with(&["solo"]).await;
        let job = cycle(store.clone());

        let result = job.run(Utc::now(), &CycleOptions::default()).await;

        assert!(matches!(result, Err(JobError::Match(MatchError::NotEnoughMembers { found: 1 }))));
        assert!(store.all_meetings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_announce_requires_submission() {
        let store = store_with(&["a", "b"]).await;
        let job = cycle(store.clone());
        let outcome = job.run(Utc::now(), &CycleOptions::default()).await.unwrap();
        let meeting_id = outcome.recorded[0].id;

        assert!(matches!(
            job.announce_success(meeting_id).await,
            Err(JobError::NotCompleted(id)) if id == meeting_id
        ));

        store.record_submission(meeting_id, None).await.unwrap();
        let message = job.announce_success(meeting_id).await.unwrap();
        assert!(message.contains("had coffee!"));

        assert!(matches!(
            job.announce_success(Uuid::new_v4()).await,
            Err(JobError::MeetingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_previous_meeting_with_removed_member_is_skipped() {
        let store = store_with(&["a", "b", "c", "d"]).await;
        let members = store.list_active_members().await.unwrap();
        let february = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();
        store
            .add_meeting(MeetingRecord {
                id: Uuid::new_v4(),
                member_a: members[0].id,
                member_b: Uuid::new_v4(),
                date: february,
                created_at: february,
                venue_id: None,
            })
            .await;
        let job = cycle(store.clone());

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let outcome = job
            .run(now, &CycleOptions { dry_run: true, ..CycleOptions::default() })
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.ignored_records, 1);
        assert!(outcome.message.contains("Looks like there were no coffee catchups last month..."));
    }

    #[tokio::test]
    async fn test_seed_fixes_the_whole_message() {
        let store = store_with(&["a", "b", "c", "d", "e"]).await;
        for title in ["The Grind", "Bean Counter", "Cafe Nero", "Brew Lab", "Kiosk"] {
            store.add_location(Location { id: Uuid::new_v4(), title: title.to_string() }).await;
        }
        let job = cycle(store.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let options = CycleOptions { dry_run: true, seed: Some(11), ..CycleOptions::default() };

        let first = job.run(now, &options).await.unwrap();
        let second = job.run(now, &options).await.unwrap();

        assert!(first.message.contains("Coffee Cat suggests"));
        assert_eq!(first.message, second.message);
        assert_eq!(first.matches, second.matches);
    }
}
