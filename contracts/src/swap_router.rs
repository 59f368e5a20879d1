//! # Swap Router
//!
//! Stand-alone converter from a supported token to wrapped native currency.
//! Any caller may use it; the router keeps nothing between calls. The
//! owner is recorded for reporting only.

use std::sync::Arc;

use chamber_protocol::token::{force_approve, safe_transfer, safe_transfer_from};
use chamber_protocol::venue::SwapVenue;
use chamber_protocol::{Address, Amount, Chain, Erc20};
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{self, SwappedForWrapped};
use crate::swap_client::SupportedTokens;

/// Errors returned by [`SwapRouter::swap_for_wrapped`].
#[derive(Debug, Error)]
pub enum RouterError {
    /// The token is outside the supported set.
    #[error("Invalid token")]
    UnsupportedToken(Address),

    /// Amounts must be non-zero.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// Pulling the input or returning it failed.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// The venue rejected the trade. The input was returned to the caller.
    #[error("swap failed: {0}")]
    SwapFailed(String),
}

/// Token → wrapped-native converter.
pub struct SwapRouter {
    address: Address,
    owner: Address,
    chain: Arc<Chain>,
    venue: Arc<dyn SwapVenue>,
    supported: SupportedTokens,
    wrapped_native: Address,
}

impl SwapRouter {
    pub fn deploy(
        chain: Arc<Chain>,
        venue: Arc<dyn SwapVenue>,
        owner: &Address,
        supported: SupportedTokens,
        wrapped_native: Address,
    ) -> Arc<Self> {
        let address = chain.new_address(owner);
        info!(router = %address, %owner, tokens = supported.len(), "swap router deployed");
        Arc::new(Self {
            address,
            owner: *owner,
            chain,
            venue,
            supported,
            wrapped_native,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn supported_tokens(&self) -> &SupportedTokens {
        &self.supported
    }

    /// Pulls `amount` of `token` from `caller` and sends the wrapped native
    /// proceeds back to `caller`. Returns the wrapped amount delivered.
    pub fn swap_for_wrapped(
        &self,
        caller: &Address,
        amount: Amount,
        token: &Address,
    ) -> Result<Amount, RouterError> {
        if *token == self.wrapped_native || !self.supported.contains(token) {
            warn!(router = %self.address, %caller, %token, "unsupported token");
            return Err(RouterError::UnsupportedToken(*token));
        }
        if amount == 0 {
            return Err(RouterError::InvalidAmount);
        }
        let contract = self
            .chain
            .token(token)
            .ok_or_else(|| RouterError::TransferFailed(format!("no token contract at {token}")))?;

        let before = contract.balance_of(&self.address);
        safe_transfer_from(contract.as_ref(), &self.address, caller, &self.address, amount)
            .map_err(|e| RouterError::TransferFailed(e.to_string()))?;
        let received = contract.balance_of(&self.address).saturating_sub(before);
        if received == 0 {
            return Err(RouterError::TransferFailed(format!(
                "no {token} received from {caller}"
            )));
        }

        let venue = self.venue.address();
        let swapped = force_approve(contract.as_ref(), &self.address, &venue, received)
            .map_err(|e| e.to_string())
            .and_then(|()| {
                self.venue
                    .swap_exact_tokens_for_wrapped(&self.address, token, received, caller)
                    .map_err(|e| e.to_string())
            });
        if contract.allowance(&self.address, &venue) != 0 {
            if let Err(e) = force_approve(contract.as_ref(), &self.address, &venue, 0) {
                warn!(router = %self.address, %token, error = %e, "failed to clear venue allowance");
            }
        }

        let amount_out = match swapped {
            Ok(out) => out,
            Err(reason) => {
                self.refund(contract.as_ref(), caller, received)?;
                warn!(router = %self.address, %caller, %token, received, %reason, "swap failed, input returned");
                return Err(RouterError::SwapFailed(reason));
            }
        };

        events::emit(
            &self.chain,
            &self.address,
            &SwappedForWrapped {
                caller: *caller,
                token: *token,
                amount_in: received,
                amount_out,
            },
        );
        info!(router = %self.address, %caller, %token, amount_in = received, amount_out, "swapped for wrapped native");
        Ok(amount_out)
    }

    fn refund(&self, token: &dyn Erc20, caller: &Address, amount: Amount) -> Result<(), RouterError> {
        safe_transfer(token, &self.address, caller, amount)
            .map_err(|e| RouterError::TransferFailed(format!("refund failed: {e}")))
    }
}

impl std::fmt::Debug for SwapRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapRouter")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("venue", &self.venue.address())
            .field("supported", &self.supported)
            .finish()
    }
}
