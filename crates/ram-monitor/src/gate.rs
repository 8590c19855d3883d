//! # Retry Gate
//!
//! Redelivery is the only retry mechanism. The gate bounds it in time and
//! routes every outcome to one of three dispositions:
//!
//! - **Proceed**: run (or ran) the pipeline; acknowledge.
//! - **PermanentSkip**: acknowledge without running; redelivery cannot help.
//! - **RetryableFailure**: fail the delivery so the event comes back.
//!
//! An event older than the retry window is dropped even if the failure that
//! kept it alive was transient.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::PipelineError;

/// Why an event was consumed without producing evidence.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    /// One-time setup failed; only a cold restart fixes it.
    #[error("monitor setup failed: {0}")]
    SetupFailed(String),

    /// The retry budget for this event is exhausted.
    #[error("event from {event_timestamp} is older than the {window_secs}s retry window")]
    Expired {
        event_timestamp: DateTime<Utc>,
        window_secs: u64,
    },

    /// The push envelope could not be decoded.
    #[error("malformed push envelope: {0}")]
    MalformedEnvelope(String),

    /// The pipeline hit a permanent failure.
    #[error(transparent)]
    Permanent(PipelineError),
}

/// Disposition of one delivery.
#[derive(Debug)]
pub enum Admission {
    Proceed,
    PermanentSkip(SkipReason),
    RetryableFailure(PipelineError),
}

impl Admission {
    /// Whether the delivery should be acknowledged.
    pub fn acknowledges(&self) -> bool {
        !matches!(self, Self::RetryableFailure(_))
    }
}

/// Bounds redelivery by event age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryGate {
    window: Duration,
}

impl RetryGate {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Decide whether an event may enter the pipeline.
    pub fn admit(
        &self,
        init_failed: Option<&str>,
        event_timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Admission {
        if let Some(reason) = init_failed {
            return Admission::PermanentSkip(SkipReason::SetupFailed(reason.to_string()));
        }
        // A window too large to represent never expires anything.
        let expired = chrono::Duration::from_std(self.window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .is_some_and(|cutoff| event_timestamp < cutoff);
        if expired {
            return Admission::PermanentSkip(SkipReason::Expired {
                event_timestamp,
                window_secs: self.window.as_secs(),
            });
        }
        Admission::Proceed
    }

    /// Route the result of an admitted pipeline run.
    pub fn settle<T>(&self, result: Result<T, PipelineError>) -> Admission {
        match result {
            Ok(_) => Admission::Proceed,
            Err(e) if e.class().is_retryable() => Admission::RetryableFailure(e),
            Err(e) => Admission::PermanentSkip(SkipReason::Permanent(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::EnrichError;
    use chrono::TimeZone;
    use ram_core::EventError;
    use ram_publish::PublishError;

    fn gate() -> RetryGate {
        RetryGate::new(Duration::from_secs(600))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_event_proceeds() {
        let admission = gate().admit(None, now() - chrono::Duration::seconds(599), now());
        assert!(matches!(admission, Admission::Proceed));
    }

    #[test]
    fn event_past_window_is_skipped() {
        let admission = gate().admit(None, now() - chrono::Duration::seconds(601), now());
        assert!(matches!(
            admission,
            Admission::PermanentSkip(SkipReason::Expired { window_secs: 600, .. })
        ));
        assert!(admission.acknowledges());
    }

    #[test]
    fn event_exactly_at_window_edge_proceeds() {
        let admission = gate().admit(None, now() - chrono::Duration::seconds(600), now());
        assert!(matches!(admission, Admission::Proceed));
    }

    #[test]
    fn setup_failure_skips_even_fresh_events() {
        let admission = gate().admit(Some("no rule modules"), now(), now());
        match admission {
            Admission::PermanentSkip(SkipReason::SetupFailed(reason)) => {
                assert_eq!(reason, "no rule modules")
            }
            other => panic!("expected SetupFailed, got: {other:?}"),
        }
    }

    #[test]
    fn transient_pipeline_error_is_retryable_failure() {
        let result: Result<(), _> = Err(PipelineError::from(PublishError::NotAcknowledged {
            topic: "ram-violations".into(),
        }));
        let admission = gate().settle(result);
        assert!(matches!(admission, Admission::RetryableFailure(_)));
        assert!(!admission.acknowledges());
    }

    #[test]
    fn permanent_pipeline_error_is_skipped() {
        let result: Result<(), _> = Err(PipelineError::from(EnrichError::from(
            EventError::MissingAssetName,
        )));
        assert!(matches!(
            gate().settle(result),
            Admission::PermanentSkip(SkipReason::Permanent(_))
        ));
    }

    #[test]
    fn success_proceeds() {
        assert!(matches!(gate().settle(Ok(())), Admission::Proceed));
    }
}
