use thiserror::Error;

/// Typed errors raised while turning stored rows into events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },
    #[error("Invalid date: {value:?}")]
    InvalidDate { value: String },
    #[error("Unknown event kind: {value:?} (expected \"opening\" or \"appointment\")")]
    UnknownKind { value: String },
}
