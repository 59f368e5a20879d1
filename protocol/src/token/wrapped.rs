//! Wrapped native currency: an 18-decimal token backed 1:1 by native
//! currency held at the wrapper's own address.

use std::sync::Arc;

use super::{Erc20, StandardToken, TokenError, TransferOutcome};
use crate::chain::{Address, BankError, NativeBank};
use crate::config::NATIVE_DECIMALS;
use crate::Amount;

/// Errors from wrapping and unwrapping.
#[derive(Debug, thiserror::Error)]
pub enum WrapError {
    /// Native currency could not be moved.
    #[error("native transfer failed: {0}")]
    Native(#[from] BankError),

    /// The token side of the operation failed.
    #[error("token operation failed: {0}")]
    Token(#[from] TokenError),
}

/// The wrapped-native token contract.
#[derive(Debug)]
pub struct WrappedNative {
    inner: StandardToken,
    bank: Arc<NativeBank>,
}

impl WrappedNative {
    /// Deploys a wrapper at `address`, backed by `bank`.
    pub fn new(address: Address, symbol: &str, bank: Arc<NativeBank>) -> Self {
        Self {
            inner: StandardToken::new(address, symbol, NATIVE_DECIMALS, address),
            bank,
        }
    }

    /// Locks `value` native currency from `caller` and mints the same
    /// amount of wrapped tokens to it.
    pub fn deposit(&self, caller: &Address, value: Amount) -> Result<Amount, WrapError> {
        let me = self.inner.address();
        self.bank.transfer(caller, &me, value)?;
        if let Err(e) = self.inner.mint(&me, caller, value) {
            // Return the locked value; the mint can only fail on overflow.
            self.bank.transfer(&me, caller, value)?;
            return Err(e.into());
        }
        Ok(value)
    }

    /// Burns `amount` wrapped tokens from `caller` and releases the
    /// backing native currency to it.
    pub fn withdraw(&self, caller: &Address, amount: Amount) -> Result<Amount, WrapError> {
        let me = self.inner.address();
        self.inner.burn(&me, caller, amount)?;
        self.bank.transfer(&me, caller, amount)?;
        Ok(amount)
    }
}

impl Erc20 for WrappedNative {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn symbol(&self) -> &str {
        self.inner.symbol()
    }

    fn decimals(&self) -> u8 {
        self.inner.decimals()
    }

    fn total_supply(&self) -> Amount {
        self.inner.total_supply()
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.inner.balance_of(holder)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.inner.allowance(owner, spender)
    }

    fn transfer(
        &self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError> {
        self.inner.transfer(caller, to, amount)
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError> {
        self.inner.transfer_from(caller, from, to, amount)
    }

    fn approve(
        &self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError> {
        self.inner.approve(caller, spender, amount)
    }
}
