use chrono::{DateTime, Datelike, Month, TimeZone, Utc};

use crate::config::ReportSettings;
use crate::models::{ConfirmedMatch, Location, MeetingOutcome};

/// Calendar month before the one `now` falls in, as (year, month)
pub fn previous_month(now: DateTime<Utc>) -> (i32, u32) {
    if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    }
}

/// First instant of the given month, UTC
pub fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// `[start of previous month, start of this month)` for `now`
pub fn previous_month_range(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = previous_month(now);
    Some((month_start(year, month)?, month_start(now.year(), now.month())?))
}

fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_uppercase())
        .unwrap_or_else(|| month.to_string())
}

/// Formats the chat messages for a coffee cycle
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    record_link: String,
    success_image_url: Option<String>,
}

impl ReportBuilder {
    pub fn new(record_link: impl Into<String>, success_image_url: Option<String>) -> Self {
        Self {
            record_link: record_link.into(),
            success_image_url,
        }
    }

    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self::new(settings.record_link.clone(), settings.success_image_url.clone())
    }

    /// Full monthly announcement
    ///
    /// Previous month's completion report, this month's pairs, an optional
    /// place to try and a link for recording the catchup.
    pub fn monthly_message(
        &self,
        now: DateTime<Utc>,
        previous: &[MeetingOutcome],
        matches: &[ConfirmedMatch],
        location: Option<&Location>,
    ) -> String {
        let mut message = String::new();
        message += &self.previous_month_report(now, previous);
        message += &self.month_catchup_report(now, matches);
        if let Some(location) = location {
            message += &self.location_suggestion(location);
        }
        message += "To record your coffee catchup, click here: ";
        message += &self.record_link;
        message
    }

    /// Who did and did not catch up last month
    pub fn previous_month_report(&self, now: DateTime<Utc>, previous: &[MeetingOutcome]) -> String {
        let (year, month) = previous_month(now);
        let mut message = format!(
            "\n🐱  **COFFEE CATCHUP REPORT for {} {}** 🐱  \n",
            month_name(month),
            year
        );

        if previous.is_empty() {
            message += "Looks like there were no coffee catchups last month...\n";
            return message;
        }

        for outcome in previous {
            let mark = if outcome.completed { "✅" } else { "❌" };
            message += &format!(
                "{} {} and {}\n",
                mark,
                outcome.first.display_name(),
                outcome.second.display_name()
            );
        }
        message
    }

    /// This month's pairs
    pub fn month_catchup_report(&self, now: DateTime<Utc>, matches: &[ConfirmedMatch]) -> String {
        let date = now.format("%B %Y").to_string().to_uppercase();
        let mut message = format!("\n☕ **COFFEE CATCHUPS for {}** ☕ \n", date);

        for m in matches {
            message += &format!(
                "😺  {} and {}\n",
                m.first.display_name(),
                m.second.display_name()
            );
        }
        message
    }

    pub fn location_suggestion(&self, location: &Location) -> String {
        format!("\n🌲🌲 Coffee Cat suggests: Visit {}🌲🌲\n", location)
    }

    /// Celebration posted once a catchup has been recorded
    pub fn success_message(&self, outcome: &MeetingOutcome) -> String {
        let mut message = String::from("😺 **COFFEE CATCHUP ALERT** 😺\n");
        message += &format!(
            "Success! **{}** and **{}** had coffee!\n",
            outcome.first.display_name(),
            outcome.second.display_name()
        );

        if let Some(venue) = &outcome.venue {
            message += &format!(" They had coffee at **{}**!\n", venue.title);
        }

        if let Some(image) = &self.success_image_url {
            message += image;
        }
        message
    }
}
