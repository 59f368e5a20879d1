//! # Token Standard
//!
//! The fungible-token interface every custodial contract in this workspace
//! talks to. It mirrors the usual four entry points: balance query,
//! transfer, transfer-from and approve.
//!
//! Real tokens disagree about how they report success. Most return a
//! boolean, some return nothing at all (USDT), a few return `false` instead
//! of failing. [`TransferOutcome`] keeps that difference visible to callers,
//! and the [`safe`] helpers collapse it into a single `Result` so contracts
//! never confuse "returned nothing" with "failed".
//!
//! ```text
//! standard.rs — in-memory token with configurable quirks
//! wrapped.rs  — wrapped native currency (deposit/withdraw 1:1)
//! safe.rs     — success-normalizing call helpers
//! ```

pub mod safe;
pub mod standard;
pub mod wrapped;

pub use safe::{force_approve, safe_transfer, safe_transfer_from};
pub use standard::{StandardToken, TokenQuirks};
pub use wrapped::{WrapError, WrappedNative};

use thiserror::Error;

use crate::chain::Address;
use crate::Amount;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by token contracts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The holder does not have enough tokens.
    #[error("insufficient token balance: {holder} has {available}, needs {requested}")]
    InsufficientBalance {
        /// The debited holder.
        holder: Address,
        /// Current balance.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// The spender's allowance is too small.
    #[error("insufficient allowance: {spender} may spend {allowed}, needs {requested}")]
    InsufficientAllowance {
        /// The spending address.
        spender: Address,
        /// Current allowance.
        allowed: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// The token forbids changing a non-zero allowance to another non-zero value.
    #[error("allowance must be reset to zero before it can be changed")]
    ApproveFromNonZero,

    /// Only the issuer may mint or burn.
    #[error("unauthorized: {0} is not the token issuer")]
    Unauthorized(Address),

    /// Supply or balance arithmetic would overflow.
    #[error("token amount overflow")]
    Overflow,

    /// The token reported failure by returning `false`.
    #[error("token returned false from {0}")]
    ReturnedFalse(&'static str),
}

// ---------------------------------------------------------------------------
// Interface
// ---------------------------------------------------------------------------

/// What a mutating token call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The call returned a boolean.
    Returned(bool),
    /// The call returned nothing. Success is implied by not failing.
    NoReturn,
}

impl TransferOutcome {
    /// `true` unless the token explicitly returned `false`.
    pub fn is_success(self) -> bool {
        match self {
            TransferOutcome::Returned(ok) => ok,
            TransferOutcome::NoReturn => true,
        }
    }
}

/// The fungible-token interface.
///
/// `caller` is the identity invoking the call; implementations must treat it
/// as the authenticated sender.
pub trait Erc20: Send + Sync {
    /// Address the token is deployed at.
    fn address(&self) -> Address;

    /// Ticker symbol.
    fn symbol(&self) -> &str;

    /// Display decimals. Arithmetic never depends on this.
    fn decimals(&self) -> u8;

    /// Total tokens in existence.
    fn total_supply(&self) -> Amount;

    /// Balance held by `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// How much `spender` may pull from `owner`.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Moves `amount` from `caller` to `to`.
    fn transfer(
        &self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError>;

    /// Moves `amount` from `from` to `to`, spending `caller`'s allowance.
    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError>;

    /// Sets `spender`'s allowance over `caller`'s tokens to `amount`.
    fn approve(
        &self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<TransferOutcome, TokenError>;
}
