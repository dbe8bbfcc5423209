use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::PipelineError;

/// One reporting day: `[from_date, to_date)` in UTC, plus the invocation
/// instant used to bound ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    right_now: DateTime<Utc>,
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
}

/// The three literals substituted into the UNLOAD template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WindowLiterals {
    pub right_now: String,
    pub from_date: String,
    pub to_date: String,
}

impl TimeWindow {
    /// References from [`parse_reference_instant`] and
    /// [`reference_instant_from_millis`] always have a representable previous
    /// day. Anything earlier clamps `from_date` to the first representable day.
    pub fn ending_at(reference: DateTime<Utc>) -> Self {
        let day_before = reference
            .checked_sub_signed(Duration::hours(24))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            right_now: reference,
            from_date: start_of_day(day_before),
            to_date: start_of_day(reference),
        }
    }

    pub fn now() -> Self {
        Self::ending_at(Utc::now())
    }

    pub fn right_now(&self) -> DateTime<Utc> {
        self.right_now
    }

    pub fn from_date(&self) -> DateTime<Utc> {
        self.from_date
    }

    pub fn to_date(&self) -> DateTime<Utc> {
        self.to_date
    }

    /// `RIGHTNOW`, rendered like a JSON date: `2023-06-15T10:00:00.000Z`.
    pub fn right_now_literal(&self) -> String {
        self.right_now.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn from_date_literal(&self) -> String {
        midnight_literal(self.from_date)
    }

    pub fn to_date_literal(&self) -> String {
        midnight_literal(self.to_date)
    }

    pub fn literals(&self) -> WindowLiterals {
        WindowLiterals {
            right_now: self.right_now_literal(),
            from_date: self.from_date_literal(),
            to_date: self.to_date_literal(),
        }
    }
}

/// Parses the optional `now` override carried by an invocation event.
///
/// Accepts full RFC 3339 timestamps, offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC) and bare `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_reference_instant(text: &str) -> Result<DateTime<Utc>, PipelineError> {
    let trimmed = text.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        })
        .ok();
    windowable(parsed, text)
}

/// Epoch-millisecond form of the `now` override.
pub fn reference_instant_from_millis(millis: i64) -> Result<DateTime<Utc>, PipelineError> {
    windowable(DateTime::<Utc>::from_timestamp_millis(millis), &millis.to_string())
}

// The previous UTC day must be representable too.
fn windowable(
    reference: Option<DateTime<Utc>>,
    raw: &str,
) -> Result<DateTime<Utc>, PipelineError> {
    reference
        .filter(|reference| reference.checked_sub_signed(Duration::hours(24)).is_some())
        .ok_or_else(|| PipelineError::InvalidReferenceInstant(raw.to_string()))
}

fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn midnight_literal(instant: DateTime<Utc>) -> String {
    format!("{} 00:00:00.000Z", instant.format("%Y-%m-%d"))
}
