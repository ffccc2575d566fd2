//! `sanctuary-events` — event log primitives.
//!
//! Typed facts (`Event`), their stream metadata (`EventEnvelope`), uncommitted
//! change tracking for aggregates (`EventSourced`) and the publish/subscribe
//! boundary (`EventBus`) used to hand committed facts to downstream workflow
//! dispatchers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod sourced;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use sourced::EventSourced;
