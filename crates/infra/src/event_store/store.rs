use std::sync::Arc;

use thiserror::Error;

use sanctuary_core::ExpectedVersion;

use super::stream::{NewEvent, StoredEvent, StreamId, StreamIntegrityError, verify_stream};

#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stream is no longer at the version the writer loaded.
    #[error("{stream} is at version {actual}, writer expected {expected:?}")]
    Concurrency {
        stream: StreamId,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error(transparent)]
    Integrity(#[from] StreamIntegrityError),

    #[error("event could not be encoded: {0}")]
    Encoding(String),

    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only store of consent streams.
///
/// Backends implement [`append`](Self::append) and
/// [`load_stream`](Self::load_stream). Callers read through
/// [`read_stream`](Self::read_stream), which refuses history that does not
/// belong to the requested stream or is not numbered contiguously from 1.
pub trait EventStore: Send + Sync {
    /// Append `events` to `stream` if it is still at `expected`. All events
    /// land with consecutive sequence numbers, or none do.
    fn append(
        &self,
        stream: StreamId,
        events: Vec<NewEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Raw stream contents in sequence order; empty for an unknown stream.
    fn load_stream(&self, stream: StreamId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// [`load_stream`](Self::load_stream) plus an integrity check.
    fn read_stream(&self, stream: StreamId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let events = self.load_stream(stream)?;
        if let Err(e) = verify_stream(stream, &events) {
            tracing::error!(stream = %stream, error = %e, "stored stream failed integrity check");
            return Err(e.into());
        }
        Ok(events)
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        stream: StreamId,
        events: Vec<NewEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(stream, events, expected)
    }

    fn load_stream(&self, stream: StreamId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(stream)
    }

    fn read_stream(&self, stream: StreamId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).read_stream(stream)
    }
}
