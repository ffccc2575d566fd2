//! Aggregate root contract for event-sourced domain models.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Number of events folded into the current state.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **Admission**: `ensure_applicable(&self, event)` rejects events that are
///   malformed or illegal from the current state.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO or read the clock. Time arrives on commands
/// and events.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug + core::fmt::Display;

    /// Evolve in-memory state from a single event.
    ///
    /// Must be total over the event enum and must bump `version()` by exactly
    /// one per call.
    fn apply(&mut self, event: &Self::Event);

    /// Check that `event` is well-formed and legal from the current state.
    fn ensure_applicable(&self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

/// Rebuild an aggregate by replaying `events` in order into `fresh`.
///
/// Every event is admitted through `ensure_applicable` before it is folded, so
/// a corrupt history aborts instead of producing a partial state. Replaying
/// the same sequence into equal fresh instances always yields equal results.
pub fn reconstruct<'a, A>(
    fresh: A,
    events: impl IntoIterator<Item = &'a A::Event>,
) -> Result<A, A::Error>
where
    A: Aggregate,
    A::Event: 'a,
{
    let mut aggregate = fresh;
    for event in events {
        aggregate.ensure_applicable(event)?;
        aggregate.apply(event);
    }
    Ok(aggregate)
}
