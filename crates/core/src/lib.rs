//! `sanctuary-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, the event-sourced aggregate contract
//! and an injectable clock.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion, reconstruct};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult, ReconstructionError, require_non_blank};
pub use id::{AggregateId, ClientId, ConsentId, TenantId};
