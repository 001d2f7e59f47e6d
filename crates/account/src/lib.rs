//! Bank account domain module (event-sourced).
//!
//! Business rules for a single account, implemented purely as deterministic
//! domain logic (no IO, no storage, no clock). Persisting the recorded events
//! and loading history back is the caller's job.

pub mod account;
pub mod money;

pub use account::{
    Account, AccountCommand, AccountCreated, AccountEvent, AccountId, DepositMade, MakeDeposit,
    MakeWithdrawal, WithdrawMade, DEPOSIT_MUST_BE_POSITIVE, WITHDRAW_MUST_BE_POSITIVE,
};
pub use money::{Amount, Balance};
