//! Stream identity and the records a store keeps per stream.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use sanctuary_core::{AggregateId, ClientId, TenantId};
use sanctuary_events::{Event, EventEnvelope};

/// Which aggregate a stream belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// One client's consent ledger.
    #[serde(rename = "consent.ledger")]
    ConsentLedger,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            StreamKind::ConsentLedger => sanctuary_consent::AGGREGATE_TYPE,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one stream. Every read and write names the tenant, so one
/// tenant's stream can never be reached with another tenant's id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId {
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub kind: StreamKind,
}

impl StreamId {
    pub fn consent_ledger(tenant_id: TenantId, client_id: ClientId) -> Self {
        Self {
            tenant_id,
            aggregate_id: client_id.into(),
            kind: StreamKind::ConsentLedger,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.kind, self.aggregate_id)
    }
}

/// An event waiting to be appended. The store assigns its stream position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl NewEvent {
    /// Serialize a typed domain event, keeping its type tag and version so it
    /// can be decoded again on replay.
    pub fn encode<E>(event: &E) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        Ok(Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
        })
    }
}

/// A committed event and its 1-based position in `stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub stream: StreamId,
    pub sequence_number: u64,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl StoredEvent {
    pub(crate) fn committed(stream: StreamId, sequence_number: u64, event: NewEvent) -> Self {
        Self {
            event_id: event.event_id,
            stream,
            sequence_number,
            event_type: event.event_type,
            event_version: event.event_version,
            occurred_at: event.occurred_at,
            payload: event.payload,
        }
    }

    /// Envelope handed to bus subscribers after a successful append.
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            self.event_id,
            self.stream.tenant_id,
            self.stream.aggregate_id,
            self.stream.kind.as_str(),
            self.event_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// A loaded stream that does not line up with the stream that was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamIntegrityError {
    #[error("event {index} of {stream} belongs to tenant {found}")]
    ForeignTenant { stream: StreamId, index: usize, found: TenantId },

    #[error("event {index} of {stream} belongs to {found}")]
    ForeignStream { stream: StreamId, index: usize, found: StreamId },

    #[error("{stream} skips from sequence {last} to {found}")]
    Gap { stream: StreamId, last: u64, found: u64 },
}

/// Check that every event in `events` sits on `stream`, numbered 1, 2, 3...
pub fn verify_stream(stream: StreamId, events: &[StoredEvent]) -> Result<(), StreamIntegrityError> {
    let mut last = 0u64;
    for (index, e) in events.iter().enumerate() {
        if e.stream.tenant_id != stream.tenant_id {
            return Err(StreamIntegrityError::ForeignTenant {
                stream,
                index,
                found: e.stream.tenant_id,
            });
        }
        if e.stream != stream {
            return Err(StreamIntegrityError::ForeignStream {
                stream,
                index,
                found: e.stream,
            });
        }
        if e.sequence_number != last + 1 {
            return Err(StreamIntegrityError::Gap {
                stream,
                last,
                found: e.sequence_number,
            });
        }
        last = e.sequence_number;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(stream: StreamId, n: u64) -> StoredEvent {
        StoredEvent::committed(
            stream,
            n,
            NewEvent {
                event_id: Uuid::now_v7(),
                event_type: "consent.granted".to_string(),
                event_version: 1,
                occurred_at: Utc::now(),
                payload: json!({}),
            },
        )
    }

    #[test]
    fn kind_is_tagged_with_the_ledger_aggregate_type() {
        assert_eq!(StreamKind::ConsentLedger.as_str(), sanctuary_consent::AGGREGATE_TYPE);
        assert_eq!(
            serde_json::to_value(StreamKind::ConsentLedger).unwrap(),
            json!(sanctuary_consent::AGGREGATE_TYPE)
        );
    }

    #[test]
    fn contiguous_stream_verifies() {
        let s = StreamId::consent_ledger(TenantId::new(), ClientId::new());
        assert!(verify_stream(s, &[stored(s, 1), stored(s, 2), stored(s, 3)]).is_ok());
        assert!(verify_stream(s, &[]).is_ok());
    }

    #[test]
    fn gaps_and_foreign_events_are_reported() {
        let s = StreamId::consent_ledger(TenantId::new(), ClientId::new());

        assert_eq!(
            verify_stream(s, &[stored(s, 1), stored(s, 3)]),
            Err(StreamIntegrityError::Gap { stream: s, last: 1, found: 3 })
        );
        assert!(matches!(
            verify_stream(s, &[stored(s, 2)]),
            Err(StreamIntegrityError::Gap { last: 0, found: 2, .. })
        ));

        let other_tenant = StreamId::consent_ledger(TenantId::new(), ClientId::new());
        assert!(matches!(
            verify_stream(s, &[stored(s, 1), stored(other_tenant, 2)]),
            Err(StreamIntegrityError::ForeignTenant { index: 1, .. })
        ));

        let other_client = StreamId::consent_ledger(s.tenant_id, ClientId::new());
        assert!(matches!(
            verify_stream(s, &[stored(other_client, 1)]),
            Err(StreamIntegrityError::ForeignStream { index: 0, .. })
        ));
    }
}
