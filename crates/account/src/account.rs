use serde::{Deserialize, Serialize};

use bank_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult};
use bank_events::{Command, Event};

use crate::money::{Amount, Balance};

pub const DEPOSIT_MUST_BE_POSITIVE: &str = "A deposit must be positive";
pub const WITHDRAW_MUST_BE_POSITIVE: &str = "A withdraw must be positive";

/// Account identifier. Opaque; carries nothing beyond uniqueness.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub AggregateId);

impl AccountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Generate a fresh, random identifier.
    pub fn create() -> Self {
        Self(AggregateId::new())
    }

    pub fn as_aggregate_id(&self) -> AggregateId {
        self.0
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Account.
///
/// Every accepted command is recorded twice: applied to `balance` and
/// appended to `uncommitted_changes`. Replay through [`Account::rebuild`]
/// only does the former.
///
/// The buffer is append-only from the aggregate's point of view. Whoever
/// persists it decides what "committed" means; see [`Account::committed_version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    balance: Balance,
    uncommitted_changes: Vec<AccountEvent>,
    version: u64,
}

impl Account {
    fn blank(id: AccountId) -> Self {
        Self {
            id,
            balance: Balance::ZERO,
            uncommitted_changes: Vec::new(),
            version: 0,
        }
    }

    /// Open a new account with a zero balance.
    pub fn empty() -> Self {
        Self::with(Balance::ZERO)
    }

    /// Open a new account holding `initial_balance`.
    pub fn with(initial_balance: Balance) -> Self {
        let id = AccountId::create();
        let mut account = Self::blank(id);
        account.record(AccountEvent::AccountCreated(AccountCreated {
            account_id: id,
            initial_balance,
        }));
        account
    }

    /// Reconstruct an account from its full history, oldest event first.
    ///
    /// The history must open with `AccountCreated` and every later event must
    /// belong to that same account. Nothing lands in `uncommitted_changes`.
    pub fn rebuild<I>(events: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = AccountEvent>,
    {
        let mut events = events.into_iter();

        let first = events
            .next()
            .ok_or_else(|| DomainError::invalid_event_sequence("history is empty"))?;
        let AccountEvent::AccountCreated(created) = &first else {
            return Err(DomainError::invalid_event_sequence(format!(
                "history must start with bank.account.created, found {}",
                first.event_type()
            )));
        };

        let mut account = Self::blank(created.account_id);
        account.apply(&first);

        for (position, event) in events.enumerate().map(|(idx, e)| (idx + 1, e)) {
            if matches!(event, AccountEvent::AccountCreated(_)) {
                return Err(DomainError::invalid_event_sequence(format!(
                    "account created twice (position {position})"
                )));
            }
            if event.account_id() != account.id {
                return Err(DomainError::invalid_event_sequence(format!(
                    "event at position {position} belongs to account {}, expected {}",
                    event.account_id(),
                    account.id
                )));
            }
            if account.balance_after(&event).is_none() {
                return Err(DomainError::invalid_event_sequence(format!(
                    "balance overflow at position {position}"
                )));
            }
            account.apply(&event);
        }

        Ok(account)
    }

    pub fn deposit(&mut self, amount: Amount) -> DomainResult<()> {
        self.execute(&AccountCommand::Deposit(MakeDeposit {
            account_id: self.id,
            amount,
        }))
    }

    /// Overdraft is allowed: the balance is not checked.
    pub fn withdraw(&mut self, amount: Amount) -> DomainResult<()> {
        self.execute(&AccountCommand::Withdraw(MakeWithdrawal {
            account_id: self.id,
            amount,
        }))
    }

    /// Handle `command` and record whatever it decides.
    pub fn execute(&mut self, command: &AccountCommand) -> DomainResult<()> {
        let events = self.handle(command)?;
        for event in events {
            self.record(event);
        }
        Ok(())
    }

    pub fn account_id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    /// Events recorded since construction, in the order they were produced.
    pub fn uncommitted_changes(&self) -> &[AccountEvent] {
        &self.uncommitted_changes
    }

    /// Stream version this instance was loaded at (before any live command).
    pub fn committed_version(&self) -> u64 {
        self.version - self.uncommitted_changes.len() as u64
    }

    /// Balance once `event` is applied, or `None` if the arithmetic overflows.
    fn balance_after(&self, event: &AccountEvent) -> Option<Balance> {
        match event {
            AccountEvent::AccountCreated(e) => Some(e.initial_balance),
            AccountEvent::DepositMade(e) => self.balance.checked_add(e.amount),
            AccountEvent::WithdrawMade(e) => self.balance.checked_subtract(e.amount),
        }
    }

    fn record(&mut self, event: AccountEvent) {
        self.apply(&event);
        self.uncommitted_changes.push(event);
    }
}

impl AggregateRoot for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: MakeDeposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeDeposit {
    pub account_id: AccountId,
    pub amount: Amount,
}

/// Command: MakeWithdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeWithdrawal {
    pub account_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCommand {
    Deposit(MakeDeposit),
    Withdraw(MakeWithdrawal),
}

impl Command for AccountCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            AccountCommand::Deposit(cmd) => cmd.account_id.0,
            AccountCommand::Withdraw(cmd) => cmd.account_id.0,
        }
    }
}

/// Event: AccountCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub account_id: AccountId,
    pub initial_balance: Balance,
}

/// Event: DepositMade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMade {
    pub account_id: AccountId,
    pub amount: Amount,
}

/// Event: WithdrawMade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawMade {
    pub account_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    AccountCreated(AccountCreated),
    DepositMade(DepositMade),
    WithdrawMade(WithdrawMade),
}

impl AccountEvent {
    pub fn account_id(&self) -> AccountId {
        match self {
            AccountEvent::AccountCreated(e) => e.account_id,
            AccountEvent::DepositMade(e) => e.account_id,
            AccountEvent::WithdrawMade(e) => e.account_id,
        }
    }
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountCreated(_) => "bank.account.created",
            AccountEvent::DepositMade(_) => "bank.account.deposit_made",
            AccountEvent::WithdrawMade(_) => "bank.account.withdraw_made",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn aggregate_id(&self) -> AggregateId {
        self.account_id().0
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::AccountCreated(e) => {
                self.id = e.account_id;
                self.balance = e.initial_balance;
            }
            AccountEvent::DepositMade(e) => {
                self.balance = self.balance.add(e.amount);
            }
            AccountEvent::WithdrawMade(e) => {
                self.balance = self.balance.subtract(e.amount);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Deposit(cmd) => self.handle_deposit(cmd),
            AccountCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
        }
    }
}

impl Account {
    fn ensure_account_id(&self, account_id: AccountId) -> Result<(), DomainError> {
        if self.id != account_id {
            return Err(DomainError::invariant("account_id mismatch"));
        }
        Ok(())
    }

    fn handle_deposit(&self, cmd: &MakeDeposit) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(cmd.account_id)?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::invalid_amount(DEPOSIT_MUST_BE_POSITIVE));
        }
        if self.balance.checked_add(cmd.amount).is_none() {
            return Err(DomainError::invariant("deposit would overflow the balance"));
        }

        Ok(vec![AccountEvent::DepositMade(DepositMade {
            account_id: cmd.account_id,
            amount: cmd.amount,
        })])
    }

    fn handle_withdraw(&self, cmd: &MakeWithdrawal) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_account_id(cmd.account_id)?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::invalid_amount(WITHDRAW_MUST_BE_POSITIVE));
        }
        if self.balance.checked_subtract(cmd.amount).is_none() {
            return Err(DomainError::invariant("withdraw would overflow the balance"));
        }

        Ok(vec![AccountEvent::WithdrawMade(WithdrawMade {
            account_id: cmd.account_id,
            amount: cmd.amount,
        })])
    }
}
