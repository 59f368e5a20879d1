//! # Swap Client
//!
//! The vault's side of a token-for-native trade. Checks the token against
//! the deployment's allow-list, grants the venue exactly the allowance the
//! trade needs, runs the swap with the vault as recipient and clears the
//! allowance afterwards whatever the outcome.

use std::collections::BTreeSet;
use std::sync::Arc;

use chamber_protocol::config::DeploymentConfig;
use chamber_protocol::token::force_approve;
use chamber_protocol::venue::{SwapVenue, VenueError};
use chamber_protocol::{Address, Amount, Chain, Erc20, TokenError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from a swap attempt.
#[derive(Debug, Error)]
pub enum SwapClientError {
    /// The token is not in the allow-list.
    #[error("unsupported token {0}")]
    UnsupportedToken(Address),

    /// The venue could not be approved to pull the input.
    #[error("approval failed: {0}")]
    Approve(#[from] TokenError),

    /// The venue rejected the trade.
    #[error("{0}")]
    Venue(#[from] VenueError),
}

// ---------------------------------------------------------------------------
// Allow-list
// ---------------------------------------------------------------------------

/// Fixed set of tokens the swap paths accept as input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedTokens(BTreeSet<Address>);

impl SupportedTokens {
    /// The supported set of a deployment.
    pub fn from_config(config: &DeploymentConfig) -> Self {
        config.supported_addresses().into_iter().collect()
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Address> for SupportedTokens {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Sells tokens held by one account for native currency.
#[derive(Clone)]
pub struct SwapClient {
    chain: Arc<Chain>,
    venue: Arc<dyn SwapVenue>,
    supported: SupportedTokens,
}

impl SwapClient {
    pub fn new(chain: Arc<Chain>, venue: Arc<dyn SwapVenue>, supported: SupportedTokens) -> Self {
        Self {
            chain,
            venue,
            supported,
        }
    }

    /// Address of the venue trades go through.
    pub fn venue(&self) -> Address {
        self.venue.address()
    }

    pub fn supported(&self) -> &SupportedTokens {
        &self.supported
    }

    /// Fails with [`SwapClientError::UnsupportedToken`] outside the allow-list.
    pub fn ensure_supported(&self, token: &Address) -> Result<(), SwapClientError> {
        if self.supported.contains(token) {
            Ok(())
        } else {
            Err(SwapClientError::UnsupportedToken(*token))
        }
    }

    /// Sells `amount` of `token` held by `holder` for native currency paid
    /// back to `holder`. Returns the native custody gained.
    ///
    /// On error the holder's token balance and allowances are as before.
    pub fn sell_for_native(
        &self,
        holder: &Address,
        token: &dyn Erc20,
        amount: Amount,
    ) -> Result<Amount, SwapClientError> {
        let token_address = token.address();
        self.ensure_supported(&token_address)?;
        let venue = self.venue.address();

        force_approve(token, holder, &venue, amount)?;
        let before = self.chain.native_balance(holder);
        debug!(%holder, token = %token_address, amount, %venue, "swapping for native");

        let swapped = self
            .venue
            .swap_exact_tokens_for_native(holder, &token_address, amount, holder);
        self.clear_allowance(token, holder, &venue);
        swapped?;

        Ok(self.chain.native_balance(holder).saturating_sub(before))
    }

    fn clear_allowance(&self, token: &dyn Erc20, holder: &Address, venue: &Address) {
        if token.allowance(holder, venue) == 0 {
            return;
        }
        if let Err(e) = force_approve(token, holder, venue, 0) {
            warn!(%holder, token = %token.address(), error = %e, "failed to clear venue allowance");
        }
    }
}

impl std::fmt::Debug for SwapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapClient")
            .field("venue", &self.venue.address())
            .field("supported", &self.supported)
            .finish()
    }
}
