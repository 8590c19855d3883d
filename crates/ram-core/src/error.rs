//! # Error Types
//!
//! The monitor knows exactly two classes of failure. Permanent failures are
//! logged and the event is consumed, since redelivery cannot fix them.
//! Transient failures are surfaced to the delivery mechanism so the event
//! is redelivered inside the retry window.

use thiserror::Error;

/// Retry classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Redelivery cannot help: malformed input, broken setup, unserializable evidence.
    Permanent,
    /// Redelivery may help: engine I/O, publish failures.
    Transient,
}

impl ErrorClass {
    /// Whether the failing event should be redelivered.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// The inbound payload could not be decoded into an
/// [`AssetChangeEvent`](crate::AssetChangeEvent).
#[derive(Error, Debug)]
pub enum EventError {
    /// Payload is not valid JSON or does not match the event shape.
    #[error("malformed asset change event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload decoded but the asset carries no name.
    #[error("asset change event has an empty asset name")]
    MissingAssetName,
}

impl EventError {
    /// Event decode failures are never retryable.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Permanent
    }
}
