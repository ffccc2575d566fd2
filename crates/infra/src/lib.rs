//! Infrastructure layer: event store, command dispatch, application services,
//! consent-backed permissions and startup configuration.

pub mod command_dispatcher;
pub mod config;
pub mod consent_service;
pub mod disclosure;
pub mod event_store;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::Settings;
pub use consent_service::{ConsentService, ConsentServiceConfig};
pub use disclosure::{ConsentBackedPermission, DisclosureError, consent_backed_permission, required_consent};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StreamId, StreamKind};
