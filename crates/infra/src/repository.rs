//! Loading and saving accounts through an [`EventStore`].
//!
//! ```text
//! load:     load_stream(id) → validate ordering → deserialize → Account::rebuild
//! save:     uncommitted_changes() → serialize → append(Exact(committed_version))
//! dispatch: load → Account::execute(command) → save
//! ```
//!
//! The aggregate never clears its own buffer. An instance that has been saved
//! still reports its events as uncommitted, so saving it a second time fails
//! the optimistic check instead of duplicating history. Reload to continue.

use thiserror::Error;
use uuid::Uuid;

use bank_account::{Account, AccountCommand, AccountEvent, AccountId};
use bank_core::{AggregateRoot, DomainError, ExpectedVersion};
use bank_events::Command;

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Stream type tag written on every account event.
pub const ACCOUNT_AGGREGATE_TYPE: &str = "bank.account";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("account {0} not found")]
    NotFound(AccountId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    #[error("corrupt stream: {0}")]
    CorruptStream(String),
}

impl RepositoryError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, RepositoryError::Store(EventStoreError::Concurrency(_)))
    }
}

#[derive(Debug)]
pub struct AccountRepository<S> {
    store: S,
}

impl<S> AccountRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> AccountRepository<S>
where
    S: EventStore,
{
    /// Fetch the full history of `account_id` and replay it.
    pub fn load(&self, account_id: AccountId) -> Result<Account, RepositoryError> {
        let history = self.store.load_stream(account_id.as_aggregate_id())?;
        if history.is_empty() {
            return Err(RepositoryError::NotFound(account_id));
        }
        validate_loaded_stream(account_id, &history)?;

        let events = history
            .into_iter()
            .map(|stored| {
                serde_json::from_value::<AccountEvent>(stored.payload).map_err(|e| {
                    RepositoryError::Deserialize(format!(
                        "sequence {}: {e}",
                        stored.sequence_number
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let account = Account::rebuild(events)?;
        tracing::debug!(%account_id, version = account.version(), "account rebuilt");
        Ok(account)
    }

    /// Append the account's uncommitted changes, keyed by its id.
    pub fn save(&self, account: &Account) -> Result<Vec<StoredEvent>, RepositoryError> {
        let account_id = account.account_id();
        let uncommitted = account
            .uncommitted_changes()
            .iter()
            .map(|event| {
                UncommittedEvent::from_typed(ACCOUNT_AGGREGATE_TYPE, Uuid::now_v7(), event)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let expected = ExpectedVersion::Exact(account.committed_version());
        match self.store.append(uncommitted, expected) {
            Ok(committed) => Ok(committed),
            Err(err @ EventStoreError::Concurrency(_)) => {
                tracing::warn!(%account_id, ?expected, "account save rejected: {err}");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load the targeted account, run `command` against it, and persist the outcome.
    pub fn dispatch(&self, command: &AccountCommand) -> Result<Vec<StoredEvent>, RepositoryError> {
        let account_id = AccountId::new(command.target_aggregate_id());
        let mut account = self.load(account_id)?;

        if let Err(err) = account.execute(command) {
            tracing::warn!(%account_id, "command rejected: {err}");
            return Err(err.into());
        }

        self.save(&account)
    }
}

fn validate_loaded_stream(
    account_id: AccountId,
    stream: &[StoredEvent],
) -> Result<(), RepositoryError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != account_id.as_aggregate_id() {
            return Err(RepositoryError::CorruptStream(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.aggregate_type != ACCOUNT_AGGREGATE_TYPE {
            return Err(RepositoryError::CorruptStream(format!(
                "unexpected aggregate_type '{}' at index {idx}",
                e.aggregate_type
            )));
        }
        if e.sequence_number <= last {
            return Err(RepositoryError::CorruptStream(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_account::{Amount, Balance};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::event_store::InMemoryEventStore;

    fn stored(
        account_id: AccountId,
        sequence_number: u64,
        payload: serde_json::Value,
    ) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: account_id.as_aggregate_id(),
            aggregate_type: ACCOUNT_AGGREGATE_TYPE.to_string(),
            sequence_number,
            event_type: "bank.account.created".to_string(),
            event_version: 1,
            recorded_at: Utc::now(),
            payload,
        }
    }

    #[test]
    fn non_monotonic_stream_is_corrupt() {
        let id = AccountId::create();
        let stream = vec![stored(id, 2, json!({})), stored(id, 1, json!({}))];
        let err = validate_loaded_stream(id, &stream).unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptStream(_)));
    }

    #[test]
    fn foreign_events_make_stream_corrupt() {
        let id = AccountId::create();
        let stream = vec![stored(AccountId::create(), 1, json!({}))];
        assert!(validate_loaded_stream(id, &stream).is_err());
    }

    #[test]
    fn saved_account_loads_back() {
        let repo = AccountRepository::new(InMemoryEventStore::new());
        let mut account = Account::with(Balance::of(dec!(15.0)));
        account.withdraw(Amount::of(dec!(10.0))).unwrap();

        let committed = repo.save(&account).unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[1].event_type, "bank.account.withdraw_made");

        let loaded = repo.load(account.account_id()).unwrap();
        assert_eq!(loaded.balance(), Balance::of(dec!(5.0)));
        assert!(loaded.uncommitted_changes().is_empty());
    }
}
