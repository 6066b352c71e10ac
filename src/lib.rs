//! Appointment Slots Library
//!
//! Computes free appointment slots per day from opening and appointment
//! events kept in a SQLite `events` table.

pub mod availability;
pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod export;
pub mod traits;

// Re-export commonly used types
pub use availability::{
    Availabilities, SLOT_LENGTH_MINUTES, SlotSettings, WINDOW_SIZE, compute_availabilities,
    compute_availabilities_with, format_slot_label, get_availabilities,
};
pub use config::AppConfig;
pub use db::Database;
pub use error::EventError;
pub use event::{Event, EventKind, EventRecord, NewEvent, parse_reference_date, parse_timestamp};
pub use export::export_to_csv;
pub use traits::{Clock, EventStore, InMemoryEventStore, MockClock, SystemClock};
