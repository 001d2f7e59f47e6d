//! Infrastructure layer: event storage and account loading/saving.
//!
//! The domain crates never touch this; it is the collaborator that persists
//! `uncommitted_changes` and feeds history back into `Account::rebuild`.

pub mod event_store;
pub mod repository;

pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
};
pub use repository::{AccountRepository, RepositoryError};
