//! Append-only, tenant-scoped storage for consent streams.
//!
//! The dispatcher talks to [`EventStore`] and never to a concrete backend.

pub mod in_memory;
pub mod store;
pub mod stream;

pub use in_memory::InMemoryEventStore;
pub use store::{EventStore, EventStoreError};
pub use stream::{NewEvent, StoredEvent, StreamId, StreamIntegrityError, StreamKind, verify_stream};
