//! Availability slot computation.
//!
//! Openings are sliced into fixed-length slots, appointments remove slots
//! whose label matches one of their own slots, and the result is grouped per
//! calendar day over a fixed window starting at the reference date.
//!
//! Appointment removal compares formatted labels, not intervals. An
//! appointment that starts off the opening's slot grid removes nothing even
//! when the two overlap.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::config::AvailabilityConfig;
use crate::event::Event;
use crate::traits::EventStore;

/// Number of consecutive days covered by a computation.
pub const WINDOW_SIZE: u32 = 7;

/// Length of a single bookable slot, in minutes.
pub const SLOT_LENGTH_MINUTES: i64 = 30;

/// Window and slot granularity used by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSettings {
    pub window_days: u32,
    pub slot_length_minutes: i64,
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            window_days: WINDOW_SIZE,
            slot_length_minutes: SLOT_LENGTH_MINUTES,
        }
    }
}

impl From<&AvailabilityConfig> for SlotSettings {
    fn from(config: &AvailabilityConfig) -> Self {
        Self {
            window_days: config.window_days,
            slot_length_minutes: config.slot_length_minutes,
        }
    }
}

/// Free slot labels per day, ordered by date.
///
/// Serializes as a JSON object keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Availabilities(BTreeMap<NaiveDate, Vec<String>>);

impl Availabilities {
    /// Slots for `day`, or `None` when the day is outside the window.
    pub fn get(&self, day: NaiveDate) -> Option<&[String]> {
        self.0.get(&day).map(Vec::as_slice)
    }

    /// Slots for a `YYYY-MM-DD` key.
    pub fn get_str(&self, day: &str) -> Option<&[String]> {
        let day = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
        self.get(day)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[String])> {
        self.0.iter().map(|(day, slots)| (*day, slots.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of free slots across all days.
    pub fn slot_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn into_inner(self) -> BTreeMap<NaiveDate, Vec<String>> {
        self.0
    }
}

/// Format a slot start as `H:MM`, e.g. `9:00` or `14:30`.
pub fn format_slot_label(time: NaiveTime) -> String {
    format!("{}:{:02}", time.hour(), time.minute())
}

/// The days covered by a window starting at `reference_date`.
pub fn window_days(reference_date: NaiveDate, window_days: u32) -> impl Iterator<Item = NaiveDate> {
    reference_date.iter_days().take(window_days as usize)
}

/// Compute availabilities with the default window and slot length.
pub fn compute_availabilities(reference_date: NaiveDate, events: &[Event]) -> Availabilities {
    compute_availabilities_with(reference_date, events, SlotSettings::default())
}

/// Compute availabilities for every day of the window.
///
/// Each day is computed independently from the full event list, so input
/// order does not matter.
pub fn compute_availabilities_with(
    reference_date: NaiveDate,
    events: &[Event],
    settings: SlotSettings,
) -> Availabilities {
    let days = window_days(reference_date, settings.window_days)
        .map(|day| (day, slots_for_day(day, events, settings.slot_length_minutes)))
        .collect();

    Availabilities(days)
}

/// Fetch all events from `store` and compute availabilities.
///
/// Store failures are returned as-is. A row that cannot be parsed into an
/// event fails the whole call.
pub async fn get_availabilities<S: EventStore>(
    store: &S,
    reference_date: NaiveDate,
    settings: SlotSettings,
) -> Result<Availabilities> {
    let records = store.fetch_events().await?;

    let events = records
        .iter()
        .map(|record| {
            Event::try_from(record).with_context(|| format!("Invalid event row {}", record.id))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Computing availabilities from {} for {} days over {} events",
        reference_date,
        settings.window_days,
        events.len()
    );

    let availabilities = compute_availabilities_with(reference_date, &events, settings);

    tracing::debug!("Found {} free slots", availabilities.slot_count());

    Ok(availabilities)
}

/// Free slot labels for a single day, in chronological order.
fn slots_for_day(day: NaiveDate, events: &[Event], slot_length_minutes: i64) -> Vec<String> {
    let booked: HashSet<String> = events
        .iter()
        .filter(|event| event.is_appointment() && event.starts_on(day))
        .flat_map(|event| slot_starts(event, slot_length_minutes))
        .map(|start| format_slot_label(start.time()))
        .collect();

    // Sort on the offset from the event's start date so slots past midnight
    // stay after the ones preceding it. Overlapping openings keep every slot.
    let mut open: Vec<(Duration, NaiveDateTime)> = events
        .iter()
        .filter(|event| event.is_opening() && event.occurs_on(day))
        .flat_map(|event| {
            let midnight = event.starts_at.date().and_time(NaiveTime::MIN);
            slot_starts(event, slot_length_minutes).map(move |start| (start - midnight, start))
        })
        .collect();

    open.sort_by_key(|(offset, _)| *offset);

    open.into_iter()
        .map(|(_, start)| format_slot_label(start.time()))
        .filter(|label| !booked.contains(label))
        .collect()
}

/// Start times of the whole slots that fit in `event`.
fn slot_starts(event: &Event, slot_length_minutes: i64) -> impl Iterator<Item = NaiveDateTime> + '_ {
    let count = if slot_length_minutes > 0 {
        event.duration_minutes() / slot_length_minutes
    } else {
        0
    };

    (0..count).map(move |i| event.starts_at + Duration::minutes(i * slot_length_minutes))
}
