//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command / Event
//!   ↓
//! 1. Read the stream (tenant-scoped, integrity-checked by the store)
//!   ↓
//! 2. Decode every stored event; any failure aborts
//!   ↓
//! 3. Rehydrate (admit + fold, in sequence order)
//!   ↓
//! 4. Decide (command) or admit (event) against current state
//!   ↓
//! 5. Append with ExpectedVersion::Exact(loaded version)
//!   ↓
//! 6. Publish committed envelopes
//! ```
//!
//! A stale expected version surfaces as [`DispatchError::Concurrency`]; the
//! caller reloads and retries. Nothing is ever merged.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use sanctuary_core::{Aggregate, DomainError, ReconstructionError};
use sanctuary_events::{Event, EventBus, EventEnvelope, EventSourced};

use crate::event_store::{EventStore, EventStoreError, NewEvent, StoredEvent, StreamId, StreamIntegrityError};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The stream moved on since it was loaded.
    #[error("optimistic concurrency conflict: {0}")]
    Concurrency(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// Stored history could not be replayed. Fatal for this stream.
    #[error("aggregate reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),

    /// The command or event was rejected by the aggregate.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("event store failure: {0}")]
    Store(EventStoreError),

    /// Events were appended but publication failed (at-least-once).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl DispatchError {
    /// Only a concurrency conflict is worth retrying after a reload.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Concurrency(_))
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            e @ EventStoreError::Concurrency { .. } => DispatchError::Concurrency(e.to_string()),
            EventStoreError::Integrity(StreamIntegrityError::Gap { last, found, .. }) => {
                DispatchError::Reconstruction(ReconstructionError::OutOfOrder { last, found })
            }
            EventStoreError::Integrity(e) => DispatchError::TenantIsolation(e.to_string()),
            other => DispatchError::Store(other),
        }
    }
}

/// Reusable load → decide → append → publish engine.
///
/// Generic over the store and bus so tests run on the in-memory pair and
/// production can swap either side without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Load and rehydrate an aggregate.
    ///
    /// Strict: an unknown event type, an undecodable payload, a damaged stream
    /// or an event the aggregate rejects aborts the load. No partial state is
    /// ever returned.
    pub fn load<A>(&self, stream: StreamId, fresh: A) -> Result<EventSourced<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + DeserializeOwned,
    {
        let history = self.store.read_stream(stream)?;

        let mut aggregate = fresh;
        for stored in &history {
            let event = decode_stored::<A::Event>(stored)?;
            aggregate.ensure_applicable(&event).map_err(|e| {
                ReconstructionError::Rejected {
                    sequence_number: stored.sequence_number,
                    reason: e.to_string(),
                }
            })?;
            aggregate.apply(&event);
        }

        tracing::trace!(stream = %stream, events = history.len(), "aggregate rehydrated");
        Ok(EventSourced::new(aggregate))
    }

    /// Run a command against the current state of an aggregate.
    ///
    /// Returns the committed events; an empty vector when the command decided
    /// nothing.
    pub fn dispatch<A>(
        &self,
        stream: StreamId,
        command: &A::Command,
        fresh: A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError> + Clone,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let mut sourced = self.load(stream, fresh)?;
        sourced.execute(command)?;
        self.commit(stream, &mut sourced)
    }

    /// Append a single pre-built event after admitting it against current state.
    pub fn append_event<A>(
        &self,
        stream: StreamId,
        event: A::Event,
        fresh: A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        if event.subject_id() != stream.aggregate_id {
            return Err(DomainError::invariant("event subject does not match target stream").into());
        }
        let mut sourced = self.load(stream, fresh)?;
        sourced.apply(event)?;
        self.commit(stream, &mut sourced)
    }

    fn commit<A>(&self, stream: StreamId, sourced: &mut EventSourced<A>) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate,
        A::Event: Event + Serialize,
    {
        if !sourced.has_uncommitted() {
            return Ok(vec![]);
        }

        let expected = sourced.expected_version();
        let pending = sourced
            .uncommitted()
            .iter()
            .map(NewEvent::encode)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EventStoreError::Encoding(e.to_string()))?;

        let committed = self.store.append(stream, pending, expected).inspect_err(|e| {
            if let EventStoreError::Concurrency { actual, .. } = e {
                tracing::warn!(stream = %stream, actual, "append rejected by concurrency check");
            }
        })?;
        sourced.take_uncommitted();

        for stored in &committed {
            tracing::info!(
                stream = %stream,
                event_type = %stored.event_type,
                sequence_number = stored.sequence_number,
                "event committed"
            );
        }

        // Publish only after the append succeeded.
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

/// Decode one stored event, checking its recorded type against the payload.
fn decode_stored<E>(stored: &StoredEvent) -> Result<E, ReconstructionError>
where
    E: Event + DeserializeOwned,
{
    if !E::EVENT_TYPES.iter().any(|known| *known == stored.event_type) {
        return Err(ReconstructionError::UnknownEventType {
            event_type: stored.event_type.clone(),
            sequence_number: stored.sequence_number,
        });
    }

    let event: E = serde_json::from_value(stored.payload.clone()).map_err(|e| {
        ReconstructionError::Undecodable {
            sequence_number: stored.sequence_number,
            reason: e.to_string(),
        }
    })?;

    if event.event_type() != stored.event_type {
        return Err(ReconstructionError::Undecodable {
            sequence_number: stored.sequence_number,
            reason: format!(
                "payload decodes as '{}' but was stored as '{}'",
                event.event_type(),
                stored.event_type
            ),
        });
    }

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanctuary_core::{ClientId, ExpectedVersion, TenantId};

    #[test]
    fn store_errors_map_onto_dispatch_errors() {
        let stream = StreamId::consent_ledger(TenantId::new(), ClientId::new());

        let stale: DispatchError = EventStoreError::Concurrency {
            stream,
            expected: ExpectedVersion::Exact(1),
            actual: 2,
        }
        .into();
        assert!(stale.is_retryable());

        let gap: DispatchError = EventStoreError::Integrity(StreamIntegrityError::Gap { stream, last: 2, found: 4 }).into();
        assert!(matches!(
            gap,
            DispatchError::Reconstruction(ReconstructionError::OutOfOrder { last: 2, found: 4 })
        ));

        let foreign: DispatchError = EventStoreError::Integrity(StreamIntegrityError::ForeignStream {
            stream,
            index: 0,
            found: StreamId::consent_ledger(stream.tenant_id, ClientId::new()),
        })
        .into();
        assert!(matches!(foreign, DispatchError::TenantIsolation(_)));
        assert!(!foreign.is_retryable());
    }
}
