//! # Lending Client
//!
//! The vault's side of the lending market. Receipt holdings are never
//! cached: they are read from the market's receipt token on demand.

use std::sync::Arc;

use chamber_protocol::lending::{LendingMarket, MarketError};
use chamber_protocol::{Address, Amount, Chain};
use tracing::debug;

/// Supplies and redeems native currency on behalf of one account.
#[derive(Clone)]
pub struct LendingClient {
    chain: Arc<Chain>,
    market: Arc<dyn LendingMarket>,
}

impl LendingClient {
    pub fn new(chain: Arc<Chain>, market: Arc<dyn LendingMarket>) -> Self {
        Self { chain, market }
    }

    /// Address of the market.
    pub fn market(&self) -> Address {
        self.market.address()
    }

    /// Address of the market's receipt token.
    pub fn receipt_token(&self) -> Address {
        self.market.receipt_token()
    }

    /// Receipt tokens held by `holder`, read from the receipt token.
    pub fn receipt_balance(&self, holder: &Address) -> Amount {
        self.chain
            .token(&self.market.receipt_token())
            .map(|token| token.balance_of(holder))
            .unwrap_or(0)
    }

    /// Sends `amount` of `holder`'s native currency to the market.
    /// Returns the receipt tokens minted to `holder`.
    pub fn supply(&self, holder: &Address, amount: Amount) -> Result<Amount, MarketError> {
        debug!(%holder, market = %self.market.address(), amount, "supplying native");
        self.market.supply(holder, amount)
    }

    /// Redeems `receipt_amount` of `holder`'s receipt tokens. Returns the
    /// native custody gained.
    pub fn redeem(&self, holder: &Address, receipt_amount: Amount) -> Result<Amount, MarketError> {
        debug!(%holder, market = %self.market.address(), receipt_amount, "redeeming receipt");
        let before = self.chain.native_balance(holder);
        self.market.redeem(holder, receipt_amount)?;
        Ok(self.chain.native_balance(holder).saturating_sub(before))
    }
}

impl std::fmt::Debug for LendingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingClient")
            .field("market", &self.market.address())
            .finish()
    }
}
