use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::EventError;

/// Text form used when writing timestamps to the `events` table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Naive layouts accepted on input, tried in order after RFC 3339.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Declares a span during which slots may be booked.
    Opening,
    /// Declares a span that is already booked.
    Appointment,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Opening => "opening",
            EventKind::Appointment => "appointment",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opening" => Ok(EventKind::Opening),
            "appointment" => Ok(EventKind::Appointment),
            other => Err(EventError::UnknownKind {
                value: other.to_string(),
            }),
        }
    }
}

/// A calendar event with parsed wall-clock timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub kind: EventKind,
    pub weekly_recurring: bool,
}

impl Event {
    pub fn opening(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> Self {
        Self {
            starts_at,
            ends_at,
            kind: EventKind::Opening,
            weekly_recurring: false,
        }
    }

    pub fn appointment(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> Self {
        Self {
            starts_at,
            ends_at,
            kind: EventKind::Appointment,
            weekly_recurring: false,
        }
    }

    /// Mark the event as repeating every week on the weekday it starts.
    pub fn weekly(mut self) -> Self {
        self.weekly_recurring = true;
        self
    }

    pub fn is_opening(&self) -> bool {
        self.kind == EventKind::Opening
    }

    pub fn is_appointment(&self) -> bool {
        self.kind == EventKind::Appointment
    }

    /// Length in whole minutes, clamped to zero for inverted intervals.
    pub fn duration_minutes(&self) -> i64 {
        (self.ends_at - self.starts_at).num_minutes().max(0)
    }

    pub fn starts_on(&self, day: NaiveDate) -> bool {
        self.starts_at.date() == day
    }

    /// Whether the event takes place on `day`, counting weekly repeats.
    ///
    /// A recurring event repeats on its weekday from its own start date
    /// onwards; it never projects backwards in time.
    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        if self.starts_on(day) {
            return true;
        }
        self.weekly_recurring
            && day > self.starts_at.date()
            && day.weekday() == self.starts_at.weekday()
    }
}

impl TryFrom<&EventRecord> for Event {
    type Error = EventError;

    fn try_from(record: &EventRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            starts_at: parse_timestamp(&record.starts_at)?,
            ends_at: parse_timestamp(&record.ends_at)?,
            kind: record.kind.parse()?,
            weekly_recurring: record.weekly_recurring.unwrap_or(false),
        })
    }
}

/// Raw row from the `events` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub starts_at: String,
    pub ends_at: String,
    pub kind: String,
    pub weekly_recurring: Option<bool>,
}

/// An event about to be inserted into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub kind: EventKind,
    pub weekly_recurring: Option<bool>,
}

impl NewEvent {
    pub fn new(kind: EventKind, starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> Self {
        Self {
            starts_at,
            ends_at,
            kind,
            weekly_recurring: None,
        }
    }

    pub fn opening(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> Self {
        Self::new(EventKind::Opening, starts_at, ends_at)
    }

    pub fn appointment(starts_at: NaiveDateTime, ends_at: NaiveDateTime) -> Self {
        Self::new(EventKind::Appointment, starts_at, ends_at)
    }

    pub fn with_weekly_recurring(mut self, weekly_recurring: bool) -> Self {
        self.weekly_recurring = Some(weekly_recurring);
        self
    }

    /// Build the row the store would hand back for this event under `id`.
    pub fn to_record(&self, id: i64) -> EventRecord {
        EventRecord {
            id,
            starts_at: self.starts_at.format(TIMESTAMP_FORMAT).to_string(),
            ends_at: self.ends_at.format(TIMESTAMP_FORMAT).to_string(),
            kind: self.kind.as_str().to_string(),
            weekly_recurring: self.weekly_recurring,
        }
    }
}

/// Parse a stored or user-supplied timestamp into wall-clock time.
///
/// RFC 3339 values keep the wall-clock time of their own offset; no
/// timezone conversion happens.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, EventError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| EventError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Parse a reference date given either as `YYYY-MM-DD` or as a full timestamp.
pub fn parse_reference_date(value: &str) -> Result<NaiveDate, EventError> {
    let trimmed = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    parse_timestamp(trimmed)
        .map(|dt| dt.date())
        .map_err(|_| EventError::InvalidDate {
            value: value.to_string(),
        })
}
