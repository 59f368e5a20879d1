//! Success-normalizing wrappers around [`Erc20`] calls.
//!
//! `Returned(true)` and `NoReturn` are success. `Returned(false)` becomes
//! [`TokenError::ReturnedFalse`].

use super::{Erc20, TokenError, TransferOutcome};
use crate::chain::Address;
use crate::Amount;

fn check(outcome: TransferOutcome, operation: &'static str) -> Result<(), TokenError> {
    if outcome.is_success() {
        Ok(())
    } else {
        Err(TokenError::ReturnedFalse(operation))
    }
}

/// `transfer` that fails on a `false` return.
pub fn safe_transfer(
    token: &dyn Erc20,
    caller: &Address,
    to: &Address,
    amount: Amount,
) -> Result<(), TokenError> {
    check(token.transfer(caller, to, amount)?, "transfer")
}

/// `transfer_from` that fails on a `false` return.
pub fn safe_transfer_from(
    token: &dyn Erc20,
    caller: &Address,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> Result<(), TokenError> {
    check(token.transfer_from(caller, from, to, amount)?, "transferFrom")
}

/// Sets an allowance on tokens that refuse non-zero to non-zero changes.
///
/// Tries a direct approve first; if the token rejects it, resets the
/// allowance to zero and approves again.
pub fn force_approve(
    token: &dyn Erc20,
    caller: &Address,
    spender: &Address,
    amount: Amount,
) -> Result<(), TokenError> {
    match token.approve(caller, spender, amount) {
        Ok(outcome) if outcome.is_success() => Ok(()),
        Ok(_) | Err(TokenError::ApproveFromNonZero) => {
            check(token.approve(caller, spender, 0)?, "approve")?;
            check(token.approve(caller, spender, amount)?, "approve")
        }
        Err(e) => Err(e),
    }
}
