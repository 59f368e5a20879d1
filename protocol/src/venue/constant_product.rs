//! # Constant-Product Venue
//!
//! One token/native pool per token, priced on `x * y = k` with a
//! [`SWAP_FEE_BPS`] fee on the input. Pool reserves are bookkeeping over the
//! venue's real custody: tokens sit in the token contracts under the venue's
//! address, native currency sits in the bank.
//!
//! The pool lock is never held across a token call, so a token that calls
//! back into the venue cannot deadlock it. After the input is pulled, the
//! output is priced on what actually arrived and the reserves are updated
//! under the same lock acquisition. A failed payout reverts the reserves
//! and refunds the input.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{SwapVenue, VenueError};
use crate::chain::{Address, Chain};
use crate::config::{BPS_DENOMINATOR, SWAP_FEE_BPS};
use crate::math::mul_div;
use crate::token::{safe_transfer, safe_transfer_from, Erc20, WrappedNative};
use crate::Amount;

/// Reserves of a single pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
    /// Token side.
    pub token: Amount,
    /// Native side.
    pub native: Amount,
}

/// Where the native output of a swap goes.
#[derive(Debug, Clone, Copy)]
enum Payout {
    Native,
    Wrapped,
}

/// A Uniswap-V2-style venue with one pool per token.
pub struct ConstantProductVenue {
    address: Address,
    chain: Arc<Chain>,
    wrapped: Arc<WrappedNative>,
    pools: Mutex<HashMap<Address, PoolReserves>>,
}

impl ConstantProductVenue {
    /// Deploys a venue at a fresh address derived from `deployer`.
    pub fn deploy(chain: Arc<Chain>, deployer: &Address, wrapped: Arc<WrappedNative>) -> Arc<Self> {
        let address = chain.new_address(deployer);
        info!(venue = %address, "swap venue deployed");
        Arc::new(Self {
            address,
            chain,
            wrapped,
            pools: Mutex::new(HashMap::new()),
        })
    }

    /// Current reserves of the pool for `token`, if any.
    pub fn reserves(&self, token: &Address) -> Option<PoolReserves> {
        self.pools.lock().get(token).copied()
    }

    /// Seeds (or tops up) the pool for `token`. `provider` must have
    /// approved the venue for `token_amount` and hold `native_amount`.
    pub fn add_liquidity(
        &self,
        provider: &Address,
        token: &Address,
        token_amount: Amount,
        native_amount: Amount,
    ) -> Result<PoolReserves, VenueError> {
        if token_amount == 0 || native_amount == 0 {
            return Err(VenueError::ZeroInput);
        }
        let contract = self.resolve(token)?;
        let available = self.chain.native_balance(provider);
        if available < native_amount {
            return Err(VenueError::Native(crate::chain::BankError::InsufficientNative {
                holder: *provider,
                available,
                requested: native_amount,
            }));
        }

        let received = self.pull(contract.as_ref(), provider, token_amount)?;
        self.chain.send_native(provider, &self.address, native_amount)?;

        let mut pools = self.pools.lock();
        let pool = pools.entry(*token).or_default();
        pool.token = pool.token.checked_add(received).ok_or(VenueError::MathOverflow)?;
        pool.native = pool
            .native
            .checked_add(native_amount)
            .ok_or(VenueError::MathOverflow)?;
        info!(
            token = %token,
            token_reserve = pool.token,
            native_reserve = pool.native,
            "liquidity added"
        );
        Ok(*pool)
    }

    fn resolve(&self, token: &Address) -> Result<Arc<dyn Erc20>, VenueError> {
        self.chain
            .token(token)
            .ok_or(VenueError::UnknownToken(*token))
    }

    /// Pulls `amount` from `from` and returns what actually arrived.
    fn pull(&self, token: &dyn Erc20, from: &Address, amount: Amount) -> Result<Amount, VenueError> {
        let before = token.balance_of(&self.address);
        safe_transfer_from(token, &self.address, from, &self.address, amount)?;
        Ok(token.balance_of(&self.address).saturating_sub(before))
    }

    fn amount_out(amount_in: Amount, reserves: PoolReserves) -> Result<Amount, VenueError> {
        let fee_factor = Amount::from(BPS_DENOMINATOR - SWAP_FEE_BPS);
        let in_with_fee = amount_in
            .checked_mul(fee_factor)
            .ok_or(VenueError::MathOverflow)?;
        let denominator = reserves
            .token
            .checked_mul(Amount::from(BPS_DENOMINATOR))
            .and_then(|d| d.checked_add(in_with_fee))
            .ok_or(VenueError::MathOverflow)?;
        mul_div(in_with_fee, reserves.native, denominator).ok_or(VenueError::MathOverflow)
    }

    fn priced(amount_in: Amount, reserves: PoolReserves) -> Result<Amount, VenueError> {
        let out = Self::amount_out(amount_in, reserves)?;
        if out == 0 {
            return Err(VenueError::ZeroOutput);
        }
        if out >= reserves.native {
            return Err(VenueError::InsufficientLiquidity {
                reserve: reserves.native,
                requested: out,
            });
        }
        Ok(out)
    }

    fn quote_pool(&self, token_in: &Address, amount_in: Amount) -> Result<Amount, VenueError> {
        let reserves = self.reserves(token_in).ok_or(VenueError::NoPool(*token_in))?;
        Self::priced(amount_in, reserves)
    }

    /// Prices `received` against the live reserves and books the trade.
    fn commit(&self, token_in: &Address, received: Amount) -> Result<Amount, VenueError> {
        let mut pools = self.pools.lock();
        let pool = pools
            .get_mut(token_in)
            .ok_or(VenueError::NoPool(*token_in))?;
        let out = Self::priced(received, *pool)?;
        let token = pool.token.checked_add(received).ok_or(VenueError::MathOverflow)?;
        let native = pool.native.checked_sub(out).ok_or(VenueError::InsufficientLiquidity {
            reserve: pool.native,
            requested: out,
        })?;
        pool.token = token;
        pool.native = native;
        Ok(out)
    }

    fn revert(&self, token_in: &Address, received: Amount, out: Amount) {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get_mut(token_in) {
            pool.token = pool.token.saturating_sub(received);
            pool.native = pool.native.saturating_add(out);
        }
    }

    fn pay(&self, recipient: &Address, out: Amount, payout: Payout) -> Result<(), VenueError> {
        match payout {
            Payout::Native => self.chain.send_native(&self.address, recipient, out)?,
            Payout::Wrapped => {
                self.wrapped.deposit(&self.address, out)?;
                if let Err(e) = safe_transfer(&*self.wrapped, &self.address, recipient, out) {
                    self.wrapped.withdraw(&self.address, out)?;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    fn swap(
        &self,
        caller: &Address,
        token_in: &Address,
        amount_in: Amount,
        recipient: &Address,
        payout: Payout,
    ) -> Result<Amount, VenueError> {
        if amount_in == 0 {
            return Err(VenueError::ZeroInput);
        }
        let contract = self.resolve(token_in)?;
        // Reject before moving anything.
        self.quote_pool(token_in, amount_in)?;

        let received = self.pull(contract.as_ref(), caller, amount_in)?;
        let out = match self.commit(token_in, received) {
            Ok(out) => out,
            Err(e) => {
                safe_transfer(contract.as_ref(), &self.address, caller, received)?;
                return Err(e);
            }
        };

        if let Err(e) = self.pay(recipient, out, payout) {
            self.revert(token_in, received, out);
            safe_transfer(contract.as_ref(), &self.address, caller, received)?;
            warn!(
                venue = %self.address,
                token_in = %token_in,
                refunded = received,
                error = %e,
                "swap payout failed"
            );
            return Err(e);
        }

        debug!(
            venue = %self.address,
            token_in = %token_in,
            amount_in = received,
            amount_out = out,
            recipient = %recipient,
            payout = ?payout,
            "swap executed"
        );
        Ok(out)
    }
}

impl SwapVenue for ConstantProductVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn quote(&self, token_in: &Address, amount_in: Amount) -> Result<Amount, VenueError> {
        if amount_in == 0 {
            return Err(VenueError::ZeroInput);
        }
        self.quote_pool(token_in, amount_in)
    }

    fn swap_exact_tokens_for_native(
        &self,
        caller: &Address,
        token_in: &Address,
        amount_in: Amount,
        recipient: &Address,
    ) -> Result<Amount, VenueError> {
        self.swap(caller, token_in, amount_in, recipient, Payout::Native)
    }

    fn swap_exact_tokens_for_wrapped(
        &self,
        caller: &Address,
        token_in: &Address,
        amount_in: Amount,
        recipient: &Address,
    ) -> Result<Amount, VenueError> {
        self.swap(caller, token_in, amount_in, recipient, Payout::Wrapped)
    }
}

impl std::fmt::Debug for ConstantProductVenue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantProductVenue")
            .field("address", &self.address)
            .field("pools", &self.pools.lock().len())
            .finish()
    }
}
