//! # Native Currency Custody
//!
//! The [`NativeBank`] is the single source of truth for native-currency
//! holdings. Contracts never cache their native balance; they ask the bank.
//! Any address may receive native currency at any time. Only the holder's
//! own code path can move it out, which is why `transfer` takes the sender
//! explicitly and callers are expected to pass their own address.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use super::address::Address;
use crate::Amount;

/// Errors from native-currency transfers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    /// The sender does not hold enough native currency.
    #[error("insufficient native balance: {holder} has {available}, needs {requested}")]
    InsufficientNative {
        /// The sending address.
        holder: Address,
        /// What the sender holds.
        available: Amount,
        /// What the transfer needed.
        requested: Amount,
    },

    /// Crediting the recipient would overflow.
    #[error("native balance overflow for {0}")]
    Overflow(Address),
}

/// Per-address native-currency balances.
///
/// Every mutation runs under one lock, so concurrent transfers between
/// disjoint or overlapping accounts never lose an update.
#[derive(Debug, Default)]
pub struct NativeBank {
    balances: Mutex<HashMap<Address, Amount>>,
}

impl NativeBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the native balance of `holder` (zero if never funded).
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.lock().get(holder).copied().unwrap_or(0)
    }

    /// Creates native currency out of thin air. Genesis funding only.
    pub fn mint(&self, to: &Address, amount: Amount) -> Result<Amount, BankError> {
        let mut balances = self.balances.lock();
        let entry = balances.entry(*to).or_insert(0);
        let new_balance = entry
            .checked_add(amount)
            .ok_or(BankError::Overflow(*to))?;
        *entry = new_balance;
        Ok(new_balance)
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Both sides are validated before either balance changes, so a failed
    /// transfer leaves the bank untouched.
    pub fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), BankError> {
        let mut balances = self.balances.lock();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(BankError::InsufficientNative {
                holder: *from,
                available,
                requested: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(BankError::Overflow(*to))?;

        balances.insert(*from, available - amount);
        balances.insert(*to, credited);
        Ok(())
    }

    /// Sum of every balance. Used by conservation checks in tests.
    pub fn total_supply(&self) -> Amount {
        self.balances.lock().values().sum()
    }
}
