//! Uncommitted change tracking for event-sourced aggregates.

use sanctuary_core::{Aggregate, AggregateRoot, ExpectedVersion, reconstruct};

/// An aggregate together with the events it has produced but not yet saved.
///
/// Every mutation goes through [`EventSourced::apply`]: the event is admitted by
/// the aggregate, folded into state and appended to the uncommitted list. The
/// version the aggregate was loaded at is kept so the save can demand it via
/// `ExpectedVersion::Exact`.
#[derive(Debug, Clone)]
pub struct EventSourced<A>
where
    A: Aggregate,
{
    aggregate: A,
    loaded_version: u64,
    uncommitted: Vec<A::Event>,
}

impl<A> EventSourced<A>
where
    A: Aggregate,
{
    /// Wrap a fresh (never persisted) aggregate.
    pub fn new(fresh: A) -> Self {
        let loaded_version = fresh.version();
        Self {
            aggregate: fresh,
            loaded_version,
            uncommitted: Vec::new(),
        }
    }

    /// Rebuild from stored history; the result has nothing uncommitted.
    pub fn from_history<'a>(
        fresh: A,
        history: impl IntoIterator<Item = &'a A::Event>,
    ) -> Result<Self, A::Error>
    where
        A::Event: 'a,
    {
        Ok(Self::new(reconstruct(fresh, history)?))
    }

    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    pub fn into_aggregate(self) -> A {
        self.aggregate
    }

    /// Version observed when the aggregate was loaded (or last committed).
    pub fn loaded_version(&self) -> u64 {
        self.loaded_version
    }

    /// Concurrency expectation for saving the uncommitted events.
    pub fn expected_version(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.loaded_version)
    }

    pub fn uncommitted(&self) -> &[A::Event] {
        &self.uncommitted
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Admit, fold and record a single event.
    pub fn apply(&mut self, event: A::Event) -> Result<(), A::Error> {
        self.aggregate.ensure_applicable(&event)?;
        self.aggregate.apply(&event);
        self.uncommitted.push(event);
        Ok(())
    }

    /// Decide on a command and apply the resulting events.
    ///
    /// All-or-nothing: the decided events are folded into a staged copy first,
    /// so a rejected event leaves both state and the uncommitted list as they
    /// were.
    pub fn execute(&mut self, command: &A::Command) -> Result<&[A::Event], A::Error>
    where
        A: Clone,
    {
        let decided = self.aggregate.handle(command)?;

        let mut staged = self.aggregate.clone();
        for event in &decided {
            staged.ensure_applicable(event)?;
            staged.apply(event);
        }

        self.aggregate = staged;
        let start = self.uncommitted.len();
        self.uncommitted.extend(decided);
        Ok(&self.uncommitted[start..])
    }

    /// Hand over the uncommitted events after a successful save.
    pub fn take_uncommitted(&mut self) -> Vec<A::Event> {
        self.loaded_version = self.aggregate.version();
        std::mem::take(&mut self.uncommitted)
    }
}
