//! # Simulated Money Market
//!
//! A Compound-style native-currency market. The exchange rate starts at
//! [`INITIAL_EXCHANGE_RATE`] and grows linearly with mined blocks:
//!
//! ```text
//! rate' = rate + rate * rate_per_block * blocks / SCALE
//! receipt    = value   * SCALE / rate
//! underlying = receipt * rate  / SCALE
//! ```
//!
//! Both conversions round down, in the market's favor. Interest is paid
//! out of the market's cash, so redemptions fail once cash runs dry.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{LendingMarket, MarketError};
use crate::chain::{Address, Chain};
use crate::config::{EXCHANGE_RATE_SCALE, INITIAL_EXCHANGE_RATE, RECEIPT_DECIMALS};
use crate::math::mul_div;
use crate::token::{Erc20, StandardToken};
use crate::Amount;

#[derive(Debug, Clone, Copy)]
struct RateState {
    rate: Amount,
    last_accrual_block: u64,
}

/// In-memory money market for native currency.
pub struct SimulatedMoneyMarket {
    address: Address,
    chain: Arc<Chain>,
    receipt: Arc<StandardToken>,
    rate_per_block: Amount,
    state: Mutex<RateState>,
}

impl SimulatedMoneyMarket {
    /// Deploys the market and its receipt token, registering the token on
    /// the chain so holdings can be queried like any other token.
    pub fn deploy(
        chain: Arc<Chain>,
        deployer: &Address,
        receipt_symbol: &str,
        rate_per_block: Amount,
    ) -> Arc<Self> {
        let address = chain.new_address(deployer);
        let receipt_address = chain.new_address(&address);
        let receipt = Arc::new(StandardToken::new(
            receipt_address,
            receipt_symbol,
            RECEIPT_DECIMALS,
            address,
        ));
        chain.register_token(receipt.clone());
        let last_accrual_block = chain.block_number();
        info!(market = %address, receipt = %receipt_address, "money market deployed");

        Arc::new(Self {
            address,
            chain,
            receipt,
            rate_per_block,
            state: Mutex::new(RateState {
                rate: INITIAL_EXCHANGE_RATE,
                last_accrual_block,
            }),
        })
    }

    /// Native currency held by the market.
    pub fn cash(&self) -> Amount {
        self.chain.native_balance(&self.address)
    }

    /// The receipt token contract.
    pub fn receipt(&self) -> Arc<StandardToken> {
        Arc::clone(&self.receipt)
    }

    fn rate_at(&self, state: RateState, block: u64) -> Result<Amount, MarketError> {
        let blocks = Amount::from(block.saturating_sub(state.last_accrual_block));
        if blocks == 0 {
            return Ok(state.rate);
        }
        let growth = self
            .rate_per_block
            .checked_mul(blocks)
            .ok_or(MarketError::MathOverflow)?;
        let interest =
            mul_div(state.rate, growth, EXCHANGE_RATE_SCALE).ok_or(MarketError::MathOverflow)?;
        state
            .rate
            .checked_add(interest)
            .ok_or(MarketError::MathOverflow)
    }

    /// Brings the stored rate up to the current block.
    fn accrue(&self) -> Result<Amount, MarketError> {
        let block = self.chain.block_number();
        let mut state = self.state.lock();
        let rate = self.rate_at(*state, block)?;
        *state = RateState {
            rate,
            last_accrual_block: block,
        };
        Ok(rate)
    }
}

impl LendingMarket for SimulatedMoneyMarket {
    fn address(&self) -> Address {
        self.address
    }

    fn receipt_token(&self) -> Address {
        self.receipt.address()
    }

    fn exchange_rate(&self) -> Amount {
        let state = *self.state.lock();
        self.rate_at(state, self.chain.block_number())
            .unwrap_or(state.rate)
    }

    fn supply(&self, caller: &Address, value: Amount) -> Result<Amount, MarketError> {
        if value == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let rate = self.accrue()?;
        let minted = mul_div(value, EXCHANGE_RATE_SCALE, rate).ok_or(MarketError::MathOverflow)?;
        if minted == 0 {
            return Err(MarketError::ZeroMint(value));
        }

        self.chain.send_native(caller, &self.address, value)?;
        if let Err(e) = self.receipt.mint(&self.address, caller, minted) {
            self.chain.send_native(&self.address, caller, value)?;
            return Err(e.into());
        }

        debug!(market = %self.address, supplier = %caller, value, minted, rate, "supplied");
        Ok(minted)
    }

    fn redeem(&self, caller: &Address, receipt_amount: Amount) -> Result<Amount, MarketError> {
        if receipt_amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let rate = self.accrue()?;
        let held = self.receipt.balance_of(caller);
        if held < receipt_amount {
            return Err(MarketError::InsufficientReceipt {
                held,
                requested: receipt_amount,
            });
        }
        let underlying =
            mul_div(receipt_amount, rate, EXCHANGE_RATE_SCALE).ok_or(MarketError::MathOverflow)?;
        let cash = self.cash();
        if cash < underlying {
            return Err(MarketError::InsufficientLiquidity {
                cash,
                requested: underlying,
            });
        }

        self.receipt.burn(&self.address, caller, receipt_amount)?;
        self.chain.send_native(&self.address, caller, underlying)?;

        debug!(market = %self.address, redeemer = %caller, receipt_amount, underlying, rate, "redeemed");
        Ok(underlying)
    }
}

impl std::fmt::Debug for SimulatedMoneyMarket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedMoneyMarket")
            .field("address", &self.address)
            .field("receipt", &self.receipt.address())
            .field("rate", &self.state.lock().rate)
            .finish()
    }
}
