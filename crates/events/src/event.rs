use chrono::{DateTime, Utc};

use sanctuary_core::AggregateId;

/// A domain fact.
///
/// Events are:
/// - **immutable** (validated once at construction, never edited)
/// - **versioned** (schema evolution)
/// - **append-only** (never updated or deleted from a stream)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Every type name this event enum can carry. Stored events whose type is
    /// not listed here cannot be replayed.
    const EVENT_TYPES: &'static [&'static str];

    /// Stable event name/type identifier (e.g. "consent.granted").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Stream the fact belongs to (the subject it is about).
    fn subject_id(&self) -> AggregateId;

    /// When the fact occurred (business time, supplied by the caller's clock).
    fn occurred_at(&self) -> DateTime<Utc>;
}
