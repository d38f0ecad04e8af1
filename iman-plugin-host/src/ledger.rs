//! Accounts and transactions store behind the host proxy.

use chrono::Local;
use iman_plugin_sdk::{Account, AccountKind, NewTransaction, Transaction};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown account: {0}")]
    UnknownAccount(u64),

    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("balance of account {0} would overflow")]
    Overflow(u64),
}

/// Host-side accounts store.
pub trait AccountStore: Send + Sync {
    fn list_accounts(&self) -> Vec<Account>;

    /// All transactions, most recent first.
    fn list_transactions(&self) -> Vec<Transaction>;

    /// Records a transaction, debiting `+amount` and crediting `-amount`.
    fn add_transaction(&self, transaction: NewTransaction) -> Result<Transaction, LedgerError>;

    /// Adds `delta` to an account balance and returns the new balance.
    fn adjust_balance(&self, account_id: u64, delta: i64) -> Result<i64, LedgerError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    next_account_id: u64,
    next_transaction_id: u64,
}

impl LedgerState {
    fn account_index(&self, id: u64) -> Result<usize, LedgerError> {
        self.accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or(LedgerError::UnknownAccount(id))
    }
}

/// In-process ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger seeded with the standard chart of accounts.
    pub fn with_default_chart() -> Self {
        let ledger = Self::new();
        for (code, name, kind) in [
            ("1001", "Cash", AccountKind::Asset),
            ("1002", "Bank", AccountKind::Asset),
            ("1101", "Accounts receivable", AccountKind::Asset),
            ("2001", "Accounts payable", AccountKind::Liability),
            ("3001", "Capital", AccountKind::Equity),
            ("4001", "Sales", AccountKind::Revenue),
            ("5001", "Expenses", AccountKind::Expense),
            ("5002", "Rent expense", AccountKind::Expense),
            ("5003", "Salary expense", AccountKind::Expense),
        ] {
            ledger.open_account(code, name, kind, None);
        }
        ledger
    }

    /// Opens an account with a zero balance and returns its id.
    pub fn open_account(&self, code: &str, name: &str, kind: AccountKind, parent_id: Option<u64>) -> u64 {
        let mut state = self.lock();
        state.next_account_id += 1;
        let id = state.next_account_id;
        state.accounts.push(Account {
            id,
            code: code.to_string(),
            name: name.to_string(),
            kind,
            parent_id,
            balance: 0,
            is_active: true,
        });
        id
    }

    /// Looks up an account by its code.
    pub fn account_by_code(&self, code: &str) -> Option<Account> {
        self.lock().accounts.iter().find(|a| a.code == code).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AccountStore for MemoryLedger {
    fn list_accounts(&self) -> Vec<Account> {
        self.lock().accounts.clone()
    }

    fn list_transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.iter().rev().cloned().collect()
    }

    fn add_transaction(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        if new.amount <= 0 {
            return Err(LedgerError::InvalidAmount(new.amount));
        }

        let mut state = self.lock();
        let debit = state.account_index(new.debit_account_id)?;
        let credit = state.account_index(new.credit_account_id)?;

        // Both balances are computed before either is written.
        let debited = state.accounts[debit]
            .balance
            .checked_add(new.amount)
            .ok_or(LedgerError::Overflow(new.debit_account_id))?;
        let credit_base = if debit == credit { debited } else { state.accounts[credit].balance };
        let credited = credit_base
            .checked_sub(new.amount)
            .ok_or(LedgerError::Overflow(new.credit_account_id))?;
        state.accounts[debit].balance = debited;
        state.accounts[credit].balance = credited;

        state.next_transaction_id += 1;
        let id = state.next_transaction_id;
        let transaction = Transaction {
            id,
            number: format!("TR{}-{id}", Local::now().format("%Y%m%d%H%M%S")),
            date: new.date,
            description: new.description,
            kind: new.kind,
            amount: new.amount,
            debit_account_id: new.debit_account_id,
            credit_account_id: new.credit_account_id,
            is_verified: true,
        };
        state.transactions.push(transaction.clone());

        info!(number = %transaction.number, amount = transaction.amount, "Transaction recorded");
        Ok(transaction)
    }

    fn adjust_balance(&self, account_id: u64, delta: i64) -> Result<i64, LedgerError> {
        let mut state = self.lock();
        let index = state.account_index(account_id)?;
        let account = &mut state.accounts[index];
        account.balance = account
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::Overflow(account_id))?;
        Ok(account.balance)
    }
}
