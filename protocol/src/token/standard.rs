//! # In-Memory Token
//!
//! A [`StandardToken`] keeps balances and allowances behind a single lock.
//! Its [`TokenQuirks`] reproduce the behaviors of real-world tokens that
//! break naive integrations: no return value, the approve-from-zero rule,
//! fee-on-transfer and `false` instead of failure.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{Erc20, TokenError, TransferOutcome};
use crate::chain::Address;
use crate::config::BPS_DENOMINATOR;
use crate::Amount;

/// Behavioral deviations from the plain token standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenQuirks {
    /// `false` makes every mutating call return nothing.
    pub returns_value: bool,
    /// Reject changing a non-zero allowance to another non-zero value.
    pub approve_requires_zero: bool,
    /// Fee burned on every transfer, in basis points of the amount.
    pub transfer_fee_bps: u32,
    /// Report failures as `Returned(false)` instead of an error.
    pub false_on_failure: bool,
}

impl Default for TokenQuirks {
    fn default() -> Self {
        Self {
            returns_value: true,
            approve_requires_zero: false,
            transfer_fee_bps: 0,
            false_on_failure: false,
        }
    }
}

impl TokenQuirks {
    /// Tether's behavior: no return values and the approve-from-zero rule.
    pub fn usdt() -> Self {
        Self {
            returns_value: false,
            approve_requires_zero: true,
            ..Self::default()
        }
    }

    /// A deflationary token that burns `bps` of every transfer.
    pub fn fee_on_transfer(bps: u32) -> Self {
        Self {
            transfer_fee_bps: bps,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct TokenState {
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl TokenState {
    fn balance(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Moves `amount` out of `from`, burning the transfer fee, and returns
    /// what `to` actually received. Nothing is written unless every check
    /// passes.
    fn move_tokens(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        fee_bps: u32,
    ) -> Result<Amount, TokenError> {
        let available = self.balance(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                available,
                requested: amount,
            });
        }
        let fee = amount
            .checked_mul(Amount::from(fee_bps))
            .ok_or(TokenError::Overflow)?
            / Amount::from(BPS_DENOMINATOR);
        let received = amount - fee;

        if from == to {
            self.balances.insert(*from, available - fee);
        } else {
            let credited = self
                .balance(to)
                .checked_add(received)
                .ok_or(TokenError::Overflow)?;
            self.balances.insert(*from, available - amount);
            self.balances.insert(*to, credited);
        }
        self.total_supply -= fee;
        Ok(received)
    }
}

/// A fungible token living entirely in memory.
#[derive(Debug)]
pub struct StandardToken {
    address: Address,
    symbol: String,
    decimals: u8,
    issuer: Address,
    quirks: TokenQuirks,
    state: Mutex<TokenState>,
}

impl StandardToken {
    /// A well-behaved token.
    pub fn new(address: Address, symbol: &str, decimals: u8, issuer: Address) -> Self {
        Self::with_quirks(address, symbol, decimals, issuer, TokenQuirks::default())
    }

    /// A token with the given quirks.
    pub fn with_quirks(
        address: Address,
        symbol: &str,
        decimals: u8,
        issuer: Address,
        quirks: TokenQuirks,
    ) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            decimals,
            issuer,
            quirks,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// The only identity allowed to mint and burn.
    pub fn issuer(&self) -> Address {
        self.issuer
    }

    /// The configured quirks.
    pub fn quirks(&self) -> TokenQuirks {
        self.quirks
    }

    /// Issues new tokens to `to`.
    pub fn mint(&self, caller: &Address, to: &Address, amount: Amount) -> Result<Amount, TokenError> {
        if *caller != self.issuer {
            return Err(TokenError::Unauthorized(*caller));
        }
        let mut state = self.state.lock();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = state
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        state.total_supply = supply;
        state.balances.insert(*to, balance);
        Ok(balance)
    }

    /// Destroys `amount` of `from`'s tokens.
    pub fn burn(&self, caller: &Address, from: &Address, amount: Amount) -> Result<Amount, TokenError> {
        if *caller != self.issuer {
            return Err(TokenError::Unauthorized(*caller));
        }
        let mut state = self.state.lock();
        let available = state.balance(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                available,
                requested: amount,
            });
        }
        state.balances.insert(*from, available - amount);
        state.total_supply -= amount;
        Ok(available - amount)
    }

    fn success(&self) -> TransferOutcome {
        if self.quirks.returns_value {
            TransferOutcome::Returned(true)
        } else {
            TransferOutcome::NoReturn
        }
    }

    fn settle(&self, result: Result<(), TokenError>) -> Result<TransferOutcome, TokenError> {
        match result {
            Ok(()) => Ok(self.success()),
            Err(_) if self.quirks.false_on_failure => Ok(TransferOutcome::Returned(false)),
            Err(e) => Err(e),
        }
    }
}

impl Erc20 for StandardToken {
    fn address(&self) -> Address {
        self.address
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn total_supply(&self) -> Amount {
        self.state.lock().total_supply
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.state.lock().balance(holder)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state
            .lock()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError> {
        let result = self
            .state
            .lock()
            .move_tokens(caller, to, amount, self.quirks.transfer_fee_bps)
            .map(|_| ());
        self.settle(result)
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError> {
        let mut state = self.state.lock();
        let key = (*from, *caller);
        let allowed = state.allowances.get(&key).copied().unwrap_or(0);
        let result = if allowed < amount {
            Err(TokenError::InsufficientAllowance {
                spender: *caller,
                allowed,
                requested: amount,
            })
        } else {
            state.move_tokens(from, to, amount, self.quirks.transfer_fee_bps)
        };
        // An unlimited allowance is never drawn down.
        if result.is_ok() && allowed != Amount::MAX {
            state.allowances.insert(key, allowed - amount);
        }
        drop(state);
        self.settle(result.map(|_| ()))
    }

    fn approve(
        &self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError> {
        let mut state = self.state.lock();
        let key = (*caller, *spender);
        let current = state.allowances.get(&key).copied().unwrap_or(0);
        if self.quirks.approve_requires_zero && amount != 0 && current != 0 {
            return Err(TokenError::ApproveFromNonZero);
        }
        state.allowances.insert(key, amount);
        Ok(self.success())
    }
}
