//! # Evidence Publisher
//!
//! Every record is serialized before anything is sent, so an unserializable
//! violation never leaves a status record published on its own. Sends then
//! run as one supervised task group: the first failure aborts the sends
//! still in flight and fails the invocation.

use std::sync::Arc;

use ram_core::{ComplianceStatus, Violation};
use tokio::task::JoinSet;

use crate::sink::{EvidenceSink, PublishError};

/// Acknowledgment ids returned by the channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub status_ack: String,
    pub violation_acks: Vec<String>,
}

#[derive(Debug)]
enum Record {
    Status,
    Violation,
}

/// Publishes one status record and N violation records per invocation.
#[derive(Clone)]
pub struct EvidencePublisher {
    sink: Arc<dyn EvidenceSink>,
    status_topic: String,
    violation_topic: String,
}

impl std::fmt::Debug for EvidencePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidencePublisher")
            .field("status_topic", &self.status_topic)
            .field("violation_topic", &self.violation_topic)
            .finish()
    }
}

impl EvidencePublisher {
    pub fn new(
        sink: Arc<dyn EvidenceSink>,
        status_topic: impl Into<String>,
        violation_topic: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            status_topic: status_topic.into(),
            violation_topic: violation_topic.into(),
        }
    }

    /// Publish `status` and every violation, returning once all are
    /// acknowledged.
    pub async fn publish(
        &self,
        status: &ComplianceStatus,
        violations: &[Violation],
    ) -> Result<PublishReport, PublishError> {
        let status_payload =
            serde_json::to_vec(status).map_err(|e| PublishError::Serialization {
                record: "compliance status",
                source: e,
            })?;
        let violation_payloads = violations
            .iter()
            .map(|v| {
                serde_json::to_vec(v).map_err(|e| PublishError::Serialization {
                    record: "violation",
                    source: e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut tasks = JoinSet::new();
        self.spawn(&mut tasks, Record::Status, 0, self.status_topic.clone(), status_payload);
        for (index, payload) in violation_payloads.into_iter().enumerate() {
            self.spawn(
                &mut tasks,
                Record::Violation,
                index,
                self.violation_topic.clone(),
                payload,
            );
        }

        let mut status_ack = None;
        let mut violation_acks = vec![String::new(); violations.len()];
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(PublishError::Aborted {
                    topic: "unknown".to_string(),
                    message: e.to_string(),
                }),
            };
            match outcome {
                Ok((Record::Status, _, ack)) => status_ack = Some(ack),
                Ok((Record::Violation, index, ack)) => violation_acks[index] = ack,
                Err(e) => {
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    tracing::warn!(
                        asset_name = %status.asset_name,
                        error = %e,
                        "evidence publish failed, aborted remaining sends"
                    );
                    return Err(e);
                }
            }
        }

        let status_ack = status_ack.ok_or_else(|| PublishError::NotAcknowledged {
            topic: self.status_topic.clone(),
        })?;
        tracing::info!(
            asset_name = %status.asset_name,
            compliant = status.compliant,
            violations = violation_acks.len(),
            "evidence published"
        );
        Ok(PublishReport {
            status_ack,
            violation_acks,
        })
    }

    fn spawn(
        &self,
        tasks: &mut JoinSet<Result<(Record, usize, String), PublishError>>,
        record: Record,
        index: usize,
        topic: String,
        payload: Vec<u8>,
    ) {
        let sink = self.sink.clone();
        tasks.spawn(async move {
            let ack = sink.publish(&topic, payload).await?;
            tracing::debug!(%topic, ?record, index, %ack, "record acknowledged");
            Ok((record, index, ack))
        });
    }
}
