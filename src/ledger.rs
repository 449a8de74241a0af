//! Balance ledger
//!
//! The ledger is the only state mutated from more than one call path (manual
//! spins, autoplay spins, deposit and withdrawal collaborators). Every
//! mutation goes through [`Ledger::debit`] or [`Ledger::credit`], each of
//! which runs under one lock, so no caller can observe a half-applied change.

use crate::errors::LedgerError;
use crate::money::Money;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Shared handle to a single non-negative balance
#[derive(Clone, Debug)]
pub struct Ledger {
    balance: Arc<Mutex<Money>>,
}

impl Ledger {
    pub fn new(starting_balance: Money) -> Self {
        Self {
            balance: Arc::new(Mutex::new(starting_balance)),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Money> {
        self.balance.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current balance
    pub fn balance(&self) -> Money {
        *self.guard()
    }

    pub fn can_afford(&self, amount: Money) -> bool {
        self.balance() >= amount
    }

    /// Remove `amount`, returning the new balance.
    ///
    /// Leaves the balance untouched when funds are short.
    pub fn debit(&self, amount: Money) -> Result<Money, LedgerError> {
        let mut balance = self.guard();
        let updated = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                requested: amount,
                available: *balance,
            })?;
        *balance = updated;
        debug!("ledger debit {} -> balance {}", amount, updated);
        Ok(updated)
    }

    /// Add `amount`, returning the new balance
    pub fn credit(&self, amount: Money) -> Result<Money, LedgerError> {
        let mut balance = self.guard();
        let updated = balance.checked_add(amount).ok_or(LedgerError::Overflow {
            balance: *balance,
            amount,
        })?;
        *balance = updated;
        debug!("ledger credit {} -> balance {}", amount, updated);
        Ok(updated)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Money::ZERO)
    }
}
