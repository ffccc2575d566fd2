use std::collections::HashMap;
use std::sync::RwLock;

use sanctuary_core::ExpectedVersion;

use super::store::{EventStore, EventStoreError};
use super::stream::{NewEvent, StoredEvent, StreamId};

/// Consent streams held in process memory, keyed by [`StreamId`].
///
/// For tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams that hold at least one event.
    pub fn stream_count(&self) -> Result<usize, EventStoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.len())
    }
}

fn poisoned() -> EventStoreError {
    EventStoreError::Unavailable("stream map lock poisoned".to_string())
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        stream: StreamId,
        events: Vec<NewEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut streams = self.streams.write().map_err(|_| poisoned())?;
        let history = streams.entry(stream).or_default();
        let actual = history.last().map_or(0, |e| e.sequence_number);

        if !expected.matches(actual) {
            tracing::debug!(stream = %stream, actual, ?expected, "append refused: stream moved on");
            // Leave no empty stream behind for a refused first write.
            if history.is_empty() {
                streams.remove(&stream);
            }
            return Err(EventStoreError::Concurrency { stream, expected, actual });
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(actual + 1..)
            .map(|(event, seq)| StoredEvent::committed(stream, seq, event))
            .collect();
        history.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn load_stream(&self, stream: StreamId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;
        Ok(streams.get(&stream).cloned().unwrap_or_default())
    }
}
