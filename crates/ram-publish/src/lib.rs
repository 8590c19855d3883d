//! # ram-publish — Evidence Publishing
//!
//! Every invocation emits one compliance status record to the status
//! channel and zero or more violation records to the violation channel.
//! An invocation only counts as done once every record is acknowledged:
//! a missing acknowledgment makes the whole invocation fail so the event
//! is redelivered.
//!
//! - [`EvidenceSink`]: publish one payload to one topic, returning the
//!   channel's acknowledgment id.
//! - [`PubSubClient`]: REST implementation of the sink.
//! - [`MemorySink`]: recording implementation for tests.
//! - [`EvidencePublisher`]: serializes the records and fans the sends out
//!   as a supervised task group.

pub mod publisher;
pub mod pubsub;
pub mod sink;

pub use publisher::{EvidencePublisher, PublishReport};
pub use pubsub::PubSubClient;
pub use sink::{EvidenceSink, MemorySink, PublishError};
