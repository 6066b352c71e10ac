//! Abstractions for time and event storage to enable testing.
//!
//! This module provides traits for:
//! - `Clock`: Abstracting time access for deterministic testing
//! - `EventStore`: The single read capability the availability core needs

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use crate::event::{EventRecord, NewEvent};

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
///
/// Used to pick the default reference date and to stamp export files.
pub trait Clock: Send + Sync {
    /// Get the current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Get the current time in the local timezone.
    fn now_local(&self) -> DateTime<Local>;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a fixed instant, for deterministic export names in tests.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    utc_time: DateTime<Utc>,
}

impl MockClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self { utc_time: time }
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.utc_time
    }

    fn now_local(&self) -> DateTime<Local> {
        self.utc_time.with_timezone(&Local)
    }
}

// ==================== EventStore Trait ====================

/// Source of event rows.
///
/// Rows come back in no particular order; callers must not rely on it.
pub trait EventStore: Send + Sync {
    /// Fetch every stored event record.
    fn fetch_events(&self) -> impl Future<Output = Result<Vec<EventRecord>>> + Send;
}

/// Vector-backed event store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with raw records.
    pub fn with_records(records: Vec<EventRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Add an event and return its id.
    pub fn insert(&self, event: &NewEvent) -> i64 {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.push(event.to_record(id));
        id
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl EventStore for InMemoryEventStore {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}
