//! End-to-end account lifecycle through the repository.
//!
//! Command → Account → uncommitted changes → EventStore → rebuild

use std::sync::Arc;

use rust_decimal_macros::dec;

use bank_account::{
    Account, AccountCommand, AccountId, Amount, Balance, MakeDeposit, MakeWithdrawal,
};
use bank_core::{AggregateRoot, DomainError};
use bank_infra::{AccountRepository, EventStore, InMemoryEventStore, RepositoryError};

fn setup() -> AccountRepository<Arc<InMemoryEventStore>> {
    bank_observability::init();
    AccountRepository::new(Arc::new(InMemoryEventStore::new()))
}

fn deposit(account_id: AccountId, value: rust_decimal::Decimal) -> AccountCommand {
    AccountCommand::Deposit(MakeDeposit {
        account_id,
        amount: Amount::of(value),
    })
}

fn withdraw(account_id: AccountId, value: rust_decimal::Decimal) -> AccountCommand {
    AccountCommand::Withdraw(MakeWithdrawal {
        account_id,
        amount: Amount::of(value),
    })
}

#[test]
fn opened_account_is_persisted_with_its_creation_event() {
    let repo = setup();
    let account = Account::empty();

    let committed = repo.save(&account).unwrap();

    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].sequence_number, 1);
    assert_eq!(committed[0].event_type, "bank.account.created");
    assert_eq!(committed[0].aggregate_id, account.account_id().as_aggregate_id());
}

#[test]
fn dispatched_commands_accumulate_in_the_stream() {
    let repo = setup();
    let account = Account::with(Balance::of(dec!(15.0)));
    let id = account.account_id();
    repo.save(&account).unwrap();

    repo.dispatch(&withdraw(id, dec!(10.0))).unwrap();
    let committed = repo.dispatch(&deposit(id, dec!(2.5))).unwrap();
    assert_eq!(committed[0].sequence_number, 3);

    let loaded = repo.load(id).unwrap();
    assert_eq!(loaded.balance(), Balance::of(dec!(7.5)));
    assert_eq!(loaded.version(), 3);
    assert!(loaded.uncommitted_changes().is_empty());
}

#[test]
fn rejected_command_appends_nothing() {
    let repo = setup();
    let account = Account::empty();
    let id = account.account_id();
    repo.save(&account).unwrap();

    let err = repo.dispatch(&deposit(id, dec!(0))).unwrap_err();
    match err {
        RepositoryError::Domain(DomainError::InvalidAmount(msg)) => {
            assert_eq!(msg, "A deposit must be positive");
        }
        other => panic!("expected invalid amount, got {other:?}"),
    }

    let err = repo.dispatch(&withdraw(id, dec!(-1))).unwrap_err();
    assert_eq!(err.to_string(), "A withdraw must be positive");

    assert_eq!(repo.store().load_stream(id.as_aggregate_id()).unwrap().len(), 1);
}

#[test]
fn saving_the_same_instance_twice_is_a_conflict() {
    let repo = setup();
    let mut account = Account::empty();
    account.deposit(Amount::of(dec!(10.0))).unwrap();

    repo.save(&account).unwrap();
    let err = repo.save(&account).unwrap_err();

    assert!(err.is_concurrency_conflict());
    assert_eq!(
        repo.store()
            .load_stream(account.account_id().as_aggregate_id())
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn stale_instance_loses_to_concurrent_writer() {
    let repo = setup();
    let account = Account::empty();
    let id = account.account_id();
    repo.save(&account).unwrap();

    let mut first = repo.load(id).unwrap();
    let mut second = repo.load(id).unwrap();

    first.deposit(Amount::of(dec!(1))).unwrap();
    second.deposit(Amount::of(dec!(2))).unwrap();

    repo.save(&first).unwrap();
    let err = repo.save(&second).unwrap_err();
    assert!(err.is_concurrency_conflict());

    assert_eq!(repo.load(id).unwrap().balance(), Balance::of(dec!(1)));
}

#[test]
fn unknown_account_is_not_found() {
    let repo = setup();
    let id = AccountId::create();

    let err = repo.load(id).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(missing) if missing == id));

    let err = repo.dispatch(&deposit(id, dec!(1))).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[test]
fn loaded_account_matches_the_live_one() {
    let repo = setup();
    let mut live = Account::with(Balance::of(dec!(100)));
    for cents in [1_050i64, 320, 7_000, 15] {
        live.deposit(Amount::of(rust_decimal::Decimal::new(cents, 2))).unwrap();
        live.withdraw(Amount::of(rust_decimal::Decimal::new(cents / 2, 2))).unwrap();
    }
    repo.save(&live).unwrap();

    let loaded = repo.load(live.account_id()).unwrap();
    assert_eq!(loaded.balance(), live.balance());
    assert_eq!(loaded.account_id(), live.account_id());
    assert_eq!(loaded.version(), live.version());
}
