//! An in-process settlement ledger.
//!
//! [`MemoryLedger`] keeps integer base-unit balances per (token, account)
//! and implements [`LedgerMirror`]. It stands in for a development chain in
//! tests and local runs. A call can be made to fail on demand with
//! [`MemoryLedger::fail_next_call`], which exercises the all-or-nothing
//! path of ledger-backed wallets.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tokenspice_types::LedgerAccount;
use tracing::warn;

use crate::LedgerError;
use crate::mirror::LedgerMirror;

#[derive(Debug, Default)]
struct Books {
    /// (token address, account) -> base units.
    balances: BTreeMap<(String, LedgerAccount), u128>,
    /// Reason for the next injected failure, if armed.
    fail_next: Option<String>,
    /// Number of calls answered (including failed ones).
    calls: u64,
}

impl Books {
    fn balance(&self, resource_address: &str, account: &LedgerAccount) -> u128 {
        self.balances
            .get(&(resource_address.to_owned(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Count the call and fire the injected failure, if any.
    fn begin_call(&mut self, operation: &'static str) -> Result<(), LedgerError> {
        self.calls = self.calls.saturating_add(1);
        if let Some(reason) = self.fail_next.take() {
            warn!(operation, %reason, "Injected ledger failure");
            return Err(LedgerError::CallFailed { operation, reason });
        }
        Ok(())
    }

    fn credit(
        &mut self,
        resource_address: &str,
        account: &LedgerAccount,
        base_amount: u128,
    ) -> Result<(), LedgerError> {
        let entry = self
            .balances
            .entry((resource_address.to_owned(), account.clone()))
            .or_insert(0);
        *entry = entry
            .checked_add(base_amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account: account.to_string(),
                resource_address: resource_address.to_owned(),
            })?;
        Ok(())
    }
}

/// In-process settlement ledger keyed by token address and account.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    books: Mutex<Books>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next ledger call fail with `reason`.
    pub fn fail_next_call(&self, reason: impl Into<String>) {
        if let Ok(mut books) = self.books.lock() {
            books.fail_next = Some(reason.into());
        }
    }

    /// Number of calls answered so far, failed ones included.
    pub fn call_count(&self) -> u64 {
        self.books.lock().map_or(0, |books| books.calls)
    }

    /// Sum of every account's balance of the token at `resource_address`,
    /// the burn account included.
    pub fn total_supply(&self, resource_address: &str) -> u128 {
        self.books.lock().map_or(0, |books| {
            books
                .balances
                .iter()
                .filter(|((token, _), _)| token == resource_address)
                .fold(0_u128, |acc, (_, base)| acc.saturating_add(*base))
        })
    }

    fn lock_books(&self, operation: &'static str) -> Result<MutexGuard<'_, Books>, LedgerError> {
        self.books.lock().map_err(|_err| LedgerError::CallFailed {
            operation,
            reason: "ledger books lock poisoned".to_owned(),
        })
    }
}

impl LedgerMirror for MemoryLedger {
    fn transfer(
        &self,
        resource_address: &str,
        from: &LedgerAccount,
        to: &LedgerAccount,
        base_amount: u128,
    ) -> Result<(), LedgerError> {
        let mut books = self.lock_books("transfer")?;
        books.begin_call("transfer")?;

        let available = books.balance(resource_address, from);
        let remaining =
            available
                .checked_sub(base_amount)
                .ok_or_else(|| LedgerError::InsufficientBalance {
                    account: from.to_string(),
                    resource_address: resource_address.to_owned(),
                    requested: base_amount,
                    available,
                })?;
        if from == to {
            return Ok(());
        }

        // Credit first: if it overflows, the debit has not happened yet.
        books.credit(resource_address, to, base_amount)?;
        books
            .balances
            .insert((resource_address.to_owned(), from.clone()), remaining);
        Ok(())
    }

    fn balance_of(
        &self,
        account: &LedgerAccount,
        resource_address: &str,
    ) -> Result<u128, LedgerError> {
        let mut books = self.lock_books("balance_of")?;
        books.begin_call("balance_of")?;
        Ok(books.balance(resource_address, account))
    }

    fn fund_from_faucet(
        &self,
        account: &LedgerAccount,
        resource_address: &str,
        base_amount: u128,
    ) -> Result<(), LedgerError> {
        let mut books = self.lock_books("fund_from_faucet")?;
        books.begin_call("fund_from_faucet")?;
        books.credit(resource_address, account, base_amount)
    }
}
