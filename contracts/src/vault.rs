//! # Vault Contract
//!
//! A per-account custody unit. Anyone may deposit tokens into a vault; only
//! its owner may move value out, sell tokens for native currency, or put
//! native currency to work in the lending market.
//!
//! ## Accounting
//!
//! Token holdings are tracked in a [`TokenLedger`] that mirrors exactly
//! what was deposited and withdrawn through the vault's own API. Native
//! currency and lending receipts are never tracked locally: they are read
//! from the chain and from the receipt token each time.
//!
//! ## Call discipline
//!
//! | Operation      | Ledger update            | External call           |
//! |----------------|--------------------------|-------------------------|
//! | `deposit`      | after the pull succeeds  | `transferFrom` caller   |
//! | `withdraw`     | before the push          | `transfer` to owner     |
//! | `buy_native`   | before the swap          | venue swap              |
//!
//! A failed external call restores the ledger before the error is returned,
//! so every operation applies all of its effects or none of them. While an
//! operation runs, any nested call into a mutating operation of the same
//! vault fails with [`VaultError::Reentrant`]. Calls from other threads wait
//! for the running operation to finish.

use std::cell::Cell;
use std::sync::Arc;

use chamber_protocol::config::NATIVE_CURRENCY;
use chamber_protocol::token::{safe_transfer, safe_transfer_from};
use chamber_protocol::{Address, Amount, Chain, Erc20};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::events::{
    self, BoughtNative, Deposited, NativeWithdrawn, RedeemedNative, SuppliedNative, Withdrawn,
};
use crate::ledger::{LedgerError, TokenLedger};
use crate::lending_client::LendingClient;
use crate::swap_client::{SwapClient, SwapClientError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by vault operations. Every error leaves the vault as it
/// was before the call.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The requested amount exceeds the tracked or custodial balance.
    #[error("insufficient balance of {token}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Token address, or the native pseudo-identifier.
        token: Address,
        /// What the vault can spend.
        available: Amount,
        /// What the caller asked for.
        requested: Amount,
    },

    /// A token transfer into or out of the vault did not succeed.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// The token cannot be used with this operation.
    #[error("unsupported token {0}")]
    UnsupportedToken(Address),

    /// The swap venue rejected the trade.
    #[error("swap failed: {0}")]
    SwapFailed(String),

    /// The lending market rejected the supply.
    #[error("supply failed: {0}")]
    SupplyFailed(String),

    /// The lending market rejected the redemption.
    #[error("redeem failed: {0}")]
    RedeemFailed(String),

    /// The caller is not the vault owner.
    #[error("caller {caller} is not the vault owner")]
    NotOwner {
        /// Who tried.
        caller: Address,
    },

    /// Amounts must be non-zero.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// A mutating operation was entered while another one was running.
    #[error("reentrant call")]
    Reentrant,

    /// A ledger counter would overflow.
    #[error("balance overflow for {0}")]
    Overflow(Address),
}

impl From<LedgerError> for VaultError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientBalance {
                token,
                available,
                requested,
            } => VaultError::InsufficientBalance {
                token,
                available,
                requested,
            },
            LedgerError::Overflow { token, .. } => VaultError::Overflow(token),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub address: Address,
    pub owner: Address,
    pub factory: Address,
    /// Tracked token balances.
    pub ledger: TokenLedger,
    /// Native custody at `block`.
    #[serde(with = "chamber_protocol::amount::decimal")]
    pub native: Amount,
    /// Lending receipt tokens held at `block`.
    #[serde(with = "chamber_protocol::amount::decimal")]
    pub receipt: Amount,
    pub block: u64,
    pub taken_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Marks a running mutating operation; dropping it ends the operation.
struct CallGuard<'a> {
    active: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

/// A per-account vault. Created by [`VaultFactory`](crate::factory::VaultFactory).
pub struct Vault {
    address: Address,
    owner: Address,
    factory: Address,
    chain: Arc<Chain>,
    swap: SwapClient,
    lending: LendingClient,
    ledger: Mutex<TokenLedger>,
    call_lock: ReentrantMutex<Cell<bool>>,
}

impl Vault {
    pub(crate) fn new(
        chain: Arc<Chain>,
        address: Address,
        owner: Address,
        factory: Address,
        swap: SwapClient,
        lending: LendingClient,
    ) -> Self {
        Self {
            address,
            owner,
            factory,
            chain,
            swap,
            lending,
            ledger: Mutex::new(TokenLedger::new()),
            call_lock: ReentrantMutex::new(Cell::new(false)),
        }
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn enter(&self, operation: &'static str) -> Result<CallGuard<'_>, VaultError> {
        let active = self.call_lock.lock();
        if active.replace(true) {
            warn!(vault = %self.address, operation, "reentrant call rejected");
            return Err(VaultError::Reentrant);
        }
        Ok(CallGuard { active })
    }

    fn only_owner(&self, caller: &Address, operation: &'static str) -> Result<(), VaultError> {
        if *caller != self.owner {
            warn!(vault = %self.address, %caller, operation, "caller is not the owner");
            return Err(VaultError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    fn non_zero(amount: Amount) -> Result<(), VaultError> {
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        Ok(())
    }

    fn token_contract(&self, token: &Address) -> Result<Arc<dyn Erc20>, VaultError> {
        if *token == NATIVE_CURRENCY {
            return Err(VaultError::UnsupportedToken(*token));
        }
        self.chain
            .token(token)
            .ok_or_else(|| VaultError::TransferFailed(format!("no token contract at {token}")))
    }

    /// Puts back a debit after the external call it funded failed.
    fn restore(&self, token: &Address, amount: Amount) {
        if let Err(e) = self.ledger.lock().credit(token, amount) {
            warn!(vault = %self.address, %token, amount, error = %e, "ledger restore failed");
        }
    }

    // -----------------------------------------------------------------------
    // Token custody
    // -----------------------------------------------------------------------

    /// Pulls `amount` of `token` from `caller` and credits the ledger with
    /// what actually arrived. The caller must have approved the vault.
    /// Returns the credited amount.
    pub fn deposit(
        &self,
        caller: &Address,
        token: &Address,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        let _guard = self.enter("deposit")?;
        Self::non_zero(amount)?;
        let contract = self.token_contract(token)?;
        self.ledger.lock().check_credit(token, amount)?;

        let before = contract.balance_of(&self.address);
        safe_transfer_from(contract.as_ref(), &self.address, caller, &self.address, amount)
            .map_err(|e| {
                warn!(vault = %self.address, %token, %caller, amount, error = %e, "deposit pull failed");
                VaultError::TransferFailed(e.to_string())
            })?;
        let received = contract
            .balance_of(&self.address)
            .saturating_sub(before)
            .min(amount);
        if received == 0 {
            return Err(VaultError::TransferFailed(format!(
                "no {token} received from {caller}"
            )));
        }

        let balance = self.ledger.lock().credit(token, received)?;
        events::emit(
            &self.chain,
            &self.address,
            &Deposited {
                token: *token,
                from: *caller,
                amount: received,
            },
        );
        info!(vault = %self.address, %token, from = %caller, amount = received, balance, "deposited");
        Ok(received)
    }

    /// Sends `amount` of `token` to the owner. Returns the remaining tracked balance.
    pub fn withdraw(
        &self,
        caller: &Address,
        token: &Address,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        let _guard = self.enter("withdraw")?;
        self.only_owner(caller, "withdraw")?;
        Self::non_zero(amount)?;
        let contract = self.token_contract(token)?;

        let remaining = self.ledger.lock().debit(token, amount)?;
        if let Err(e) = safe_transfer(contract.as_ref(), &self.address, &self.owner, amount) {
            self.restore(token, amount);
            warn!(vault = %self.address, %token, amount, error = %e, "withdraw push failed");
            return Err(VaultError::TransferFailed(e.to_string()));
        }

        events::emit(
            &self.chain,
            &self.address,
            &Withdrawn {
                token: *token,
                to: self.owner,
                amount,
                remaining,
            },
        );
        info!(vault = %self.address, %token, amount, remaining, "withdrawn");
        Ok(remaining)
    }

    /// Tracked balance of `token`. Zero for the native pseudo-identifier.
    pub fn balance_of(&self, token: &Address) -> Amount {
        self.ledger.lock().balance_of(token)
    }

    // -----------------------------------------------------------------------
    // Native currency
    // -----------------------------------------------------------------------

    /// Native currency held by the vault, read from the chain.
    pub fn native_balance(&self) -> Amount {
        self.chain.native_balance(&self.address)
    }

    fn ensure_native(&self, amount: Amount) -> Result<(), VaultError> {
        let available = self.native_balance();
        if amount > available {
            return Err(VaultError::InsufficientBalance {
                token: NATIVE_CURRENCY,
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Sends `amount` of native currency to the owner. Returns what the
    /// vault still holds.
    pub fn withdraw_native(&self, caller: &Address, amount: Amount) -> Result<Amount, VaultError> {
        let _guard = self.enter("withdraw_native")?;
        self.only_owner(caller, "withdraw_native")?;
        Self::non_zero(amount)?;
        self.ensure_native(amount)?;

        self.chain
            .send_native(&self.address, &self.owner, amount)
            .map_err(|e| VaultError::TransferFailed(e.to_string()))?;

        events::emit(
            &self.chain,
            &self.address,
            &NativeWithdrawn {
                to: self.owner,
                amount,
            },
        );
        let remaining = self.native_balance();
        info!(vault = %self.address, amount, remaining, "native withdrawn");
        Ok(remaining)
    }

    /// Sells `amount` of a tracked token for native currency, kept in the
    /// vault. Returns the native proceeds.
    pub fn buy_native(
        &self,
        caller: &Address,
        token: &Address,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        let _guard = self.enter("buy_native")?;
        self.only_owner(caller, "buy_native")?;
        Self::non_zero(amount)?;
        self.swap
            .ensure_supported(token)
            .map_err(|_| VaultError::UnsupportedToken(*token))?;
        let contract = self.token_contract(token)?;

        self.ledger.lock().debit(token, amount)?;
        let proceeds = match self.swap.sell_for_native(&self.address, contract.as_ref(), amount) {
            Ok(proceeds) => proceeds,
            Err(e) => {
                self.restore(token, amount);
                warn!(vault = %self.address, %token, amount, error = %e, "swap failed");
                return Err(match e {
                    SwapClientError::UnsupportedToken(t) => VaultError::UnsupportedToken(t),
                    other => VaultError::SwapFailed(other.to_string()),
                });
            }
        };

        events::emit(
            &self.chain,
            &self.address,
            &BoughtNative {
                token: *token,
                amount_in: amount,
                proceeds,
            },
        );
        info!(vault = %self.address, %token, amount, proceeds, "bought native");
        Ok(proceeds)
    }

    // -----------------------------------------------------------------------
    // Lending
    // -----------------------------------------------------------------------

    /// Lending receipt tokens held by the vault, read from the receipt token.
    pub fn receipt_balance(&self) -> Amount {
        self.lending.receipt_balance(&self.address)
    }

    /// Supplies `amount` of native currency to the lending market. Returns
    /// the receipt tokens minted to the vault.
    pub fn supply_native(&self, caller: &Address, amount: Amount) -> Result<Amount, VaultError> {
        let _guard = self.enter("supply_native")?;
        self.only_owner(caller, "supply_native")?;
        Self::non_zero(amount)?;
        self.ensure_native(amount)?;

        let minted = self.lending.supply(&self.address, amount).map_err(|e| {
            warn!(vault = %self.address, amount, error = %e, "supply failed");
            VaultError::SupplyFailed(e.to_string())
        })?;

        events::emit(
            &self.chain,
            &self.address,
            &SuppliedNative {
                market: self.lending.market(),
                amount,
                receipt_minted: minted,
            },
        );
        info!(vault = %self.address, amount, minted, "supplied native");
        Ok(minted)
    }

    /// Redeems `receipt_amount` receipt tokens. Returns the native
    /// currency received.
    pub fn redeem_native(
        &self,
        caller: &Address,
        receipt_amount: Amount,
    ) -> Result<Amount, VaultError> {
        let _guard = self.enter("redeem_native")?;
        self.only_owner(caller, "redeem_native")?;
        Self::non_zero(receipt_amount)?;

        let received = self
            .lending
            .redeem(&self.address, receipt_amount)
            .map_err(|e| {
                warn!(vault = %self.address, receipt_amount, error = %e, "redeem failed");
                VaultError::RedeemFailed(e.to_string())
            })?;

        events::emit(
            &self.chain,
            &self.address,
            &RedeemedNative {
                market: self.lending.market(),
                receipt_amount,
                received,
            },
        );
        info!(vault = %self.address, receipt_amount, received, "redeemed native");
        Ok(received)
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    /// The identity that created this vault through the factory.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The factory that created this vault.
    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            address: self.address,
            owner: self.owner,
            factory: self.factory,
            ledger: self.ledger.lock().clone(),
            native: self.native_balance(),
            receipt: self.receipt_balance(),
            block: self.chain.block_number(),
            taken_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("factory", &self.factory)
            .field("ledger", &*self.ledger.lock())
            .finish()
    }
}
