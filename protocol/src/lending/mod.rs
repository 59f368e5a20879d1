//! # Lending Market
//!
//! Accepts native currency and mints a receipt token representing a claim
//! on the deposit plus accrued yield. Receipt holdings are ordinary token
//! balances, so anyone can read them through the token standard without
//! the market keeping a second copy.

pub mod money_market;

pub use money_market::SimulatedMoneyMarket;

use thiserror::Error;

use crate::chain::{Address, BankError};
use crate::token::TokenError;
use crate::Amount;

/// Errors raised by a lending market.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Zero supply or redeem amount.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The supplied value is too small to mint any receipt.
    #[error("supply of {0} mints zero receipt tokens")]
    ZeroMint(Amount),

    /// The supplier does not hold the native currency it tried to supply.
    #[error("native transfer failed: {0}")]
    Native(#[from] BankError),

    /// The redeemer holds fewer receipt tokens than requested.
    #[error("insufficient receipt balance: holds {held}, redeeming {requested}")]
    InsufficientReceipt {
        /// Receipt tokens held.
        held: Amount,
        /// Receipt tokens requested.
        requested: Amount,
    },

    /// The market does not hold enough cash to pay the redemption.
    #[error("insufficient market liquidity: cash {cash}, redemption needs {requested}")]
    InsufficientLiquidity {
        /// Native cash held by the market.
        cash: Amount,
        /// Underlying the redemption would pay.
        requested: Amount,
    },

    /// Receipt token mint or burn failed.
    #[error("receipt token error: {0}")]
    Receipt(#[from] TokenError),

    /// Exchange-rate arithmetic overflowed.
    #[error("math overflow in exchange rate computation")]
    MathOverflow,
}

/// The lending market interface.
pub trait LendingMarket: Send + Sync {
    /// Address of the market. Supplied native currency is held here.
    fn address(&self) -> Address;

    /// Address of the receipt token contract.
    fn receipt_token(&self) -> Address;

    /// Underlying per receipt unit, scaled by
    /// [`EXCHANGE_RATE_SCALE`](crate::config::EXCHANGE_RATE_SCALE), including
    /// interest accrued up to the current block.
    fn exchange_rate(&self) -> Amount;

    /// Moves `value` native currency from `caller` into the market and
    /// mints receipt tokens to `caller`. Returns the receipt minted.
    fn supply(&self, caller: &Address, value: Amount) -> Result<Amount, MarketError>;

    /// Burns `receipt_amount` of `caller`'s receipt tokens and pays the
    /// underlying back to `caller`. Returns the native currency paid.
    fn redeem(&self, caller: &Address, receipt_amount: Amount) -> Result<Amount, MarketError>;
}
