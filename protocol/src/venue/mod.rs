//! # Swap Venue
//!
//! The venue is a black box that trades a token for native currency (or for
//! wrapped native currency). Callers approve the venue, the venue pulls the
//! input with `transfer_from` and delivers the output to a recipient. Price
//! discovery and routing are the venue's business.

pub mod constant_product;

pub use constant_product::{ConstantProductVenue, PoolReserves};

use thiserror::Error;

use crate::chain::{Address, BankError};
use crate::token::{TokenError, WrapError};
use crate::Amount;

/// Errors raised by a swap venue.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Zero input.
    #[error("swap input must be greater than zero")]
    ZeroInput,

    /// No token contract is deployed at the input address.
    #[error("no token contract at {0}")]
    UnknownToken(Address),

    /// The venue has no pool for this token.
    #[error("no pool for token {0}")]
    NoPool(Address),

    /// The pool cannot pay out the requested output.
    #[error("insufficient liquidity: pool holds {reserve}, trade needs {requested}")]
    InsufficientLiquidity {
        /// Output-side reserve.
        reserve: Amount,
        /// Output the trade would need.
        requested: Amount,
    },

    /// The trade rounds down to nothing.
    #[error("trade output rounds to zero")]
    ZeroOutput,

    /// Pulling or pushing tokens failed.
    #[error("token transfer failed: {0}")]
    Transfer(#[from] TokenError),

    /// Moving native currency failed.
    #[error("native transfer failed: {0}")]
    Native(#[from] BankError),

    /// Wrapping the native output failed.
    #[error("wrapping failed: {0}")]
    Wrap(#[from] WrapError),

    /// Pricing arithmetic overflowed.
    #[error("math overflow while pricing the trade")]
    MathOverflow,
}

/// The swap venue interface.
pub trait SwapVenue: Send + Sync {
    /// Address the venue is deployed at. Callers approve this address.
    fn address(&self) -> Address;

    /// Native output for `amount_in` of `token_in` at current reserves.
    fn quote(&self, token_in: &Address, amount_in: Amount) -> Result<Amount, VenueError>;

    /// Pulls `amount_in` of `token_in` from `caller` and sends the native
    /// proceeds to `recipient`. Returns the proceeds.
    fn swap_exact_tokens_for_native(
        &self,
        caller: &Address,
        token_in: &Address,
        amount_in: Amount,
        recipient: &Address,
    ) -> Result<Amount, VenueError>;

    /// Like [`swap_exact_tokens_for_native`](Self::swap_exact_tokens_for_native)
    /// but pays out wrapped native tokens.
    fn swap_exact_tokens_for_wrapped(
        &self,
        caller: &Address,
        token_in: &Address,
        amount_in: Amount,
        recipient: &Address,
    ) -> Result<Amount, VenueError>;
}
