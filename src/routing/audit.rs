use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::Destination;

/// Structured record produced after a document is routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingAudit {
    pub audit_id: String,
    pub document_id: i64,
    pub flow_id: i64,
    pub status_before: i64,
    pub status_after: i64,
    pub step_sequence: i64,
    pub destination: Destination,
    /// Whether a DELIVERED step was opened before routing.
    pub received: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Collects audit fields while a routing is in flight.
#[derive(Debug, Clone)]
pub struct AuditBuilder {
    document_id: i64,
    started_at: DateTime<Utc>,
    received: bool,
}

impl AuditBuilder {
    pub fn start(document_id: i64) -> Self {
        Self {
            document_id,
            started_at: Utc::now(),
            received: false,
        }
    }

    pub fn received(mut self, received: bool) -> Self {
        self.received = received;
        self
    }

    pub fn finish(
        self,
        flow_id: i64,
        status_before: i64,
        status_after: i64,
        step_sequence: i64,
        destination: Destination,
    ) -> RoutingAudit {
        let now = Utc::now();
        RoutingAudit {
            audit_id: Uuid::new_v4().to_string(),
            document_id: self.document_id,
            flow_id,
            status_before,
            status_after,
            step_sequence,
            destination,
            received: self.received,
            started_at: self.started_at,
            completed_at: now,
            duration_ms: (now - self.started_at).num_milliseconds(),
        }
    }
}
