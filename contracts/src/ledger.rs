//! # Token Ledger
//!
//! Per-token counters of what a vault has deliberately taken into custody
//! through its own API. Pure bookkeeping: no token calls, no native
//! currency. A counter never exceeds what the vault actually holds, so
//! callers credit only after a pull succeeds and debit before a push.

use std::collections::BTreeMap;

use chamber_protocol::{Address, Amount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from ledger arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Debit exceeds the tracked balance.
    #[error("insufficient balance of {token}: tracked {available}, requested {requested}")]
    InsufficientBalance {
        /// The token being debited.
        token: Address,
        /// Current tracked balance.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Credit would overflow the counter.
    #[error("balance overflow for {token}: {balance} + {amount}")]
    Overflow {
        /// The token being credited.
        token: Address,
        /// Current tracked balance.
        balance: Amount,
        /// Amount being added.
        amount: Amount,
    },
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Tracked balances keyed by token address. Zero balances are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    #[serde(with = "chamber_protocol::amount::decimal_map")]
    balances: BTreeMap<Address, Amount>,
}

impl TokenLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked balance of `token`; zero when never credited.
    pub fn balance_of(&self, token: &Address) -> Amount {
        self.balances.get(token).copied().unwrap_or(0)
    }

    /// Fails unless `amount` could be credited to `token`.
    pub fn check_credit(&self, token: &Address, amount: Amount) -> Result<Amount, LedgerError> {
        let balance = self.balance_of(token);
        balance.checked_add(amount).ok_or(LedgerError::Overflow {
            token: *token,
            balance,
            amount,
        })
    }

    /// Adds `amount` to `token`. Returns the new balance.
    pub fn credit(&mut self, token: &Address, amount: Amount) -> Result<Amount, LedgerError> {
        let updated = self.check_credit(token, amount)?;
        if updated > 0 {
            self.balances.insert(*token, updated);
        }
        Ok(updated)
    }

    /// Subtracts `amount` from `token`. Returns the new balance.
    pub fn debit(&mut self, token: &Address, amount: Amount) -> Result<Amount, LedgerError> {
        let available = self.balance_of(token);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                token: *token,
                available,
                requested: amount,
            })?;
        if remaining == 0 {
            self.balances.remove(token);
        } else {
            self.balances.insert(*token, remaining);
        }
        Ok(remaining)
    }

    /// All non-zero balances, ordered by token address.
    pub fn balances(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }

    /// Number of tokens with a non-zero balance.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
