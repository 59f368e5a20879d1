// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Chamber Contracts
//!
//! Per-account token vaults and the pieces around them:
//!
//! - **Vault** — custody of many tokens plus native currency, with an
//!   internal ledger that never overstates what the vault holds, owner-gated
//!   withdrawals, token→native swaps and native lending.
//! - **Vault Factory** — deploys vaults bound to their creator and keeps an
//!   owner → vaults registry.
//! - **Swap Router** — stateless token → wrapped-native converter for any caller.
//!
//! ## Design Principles
//!
//! 1. Ledger arithmetic is checked; overflow is an error, never a wrap.
//! 2. Operations apply all of their effects or none of them. A failed
//!    external call is compensated before the error is returned.
//! 3. Token return values are normalized through the safe-call helpers, so
//!    tokens that return nothing work the same as tokens that return `true`.
//! 4. Native currency and lending receipts are always read from their
//!    source, never mirrored locally.

pub mod events;
pub mod factory;
pub mod ledger;
pub mod lending_client;
pub mod swap_client;
pub mod swap_router;
pub mod vault;

pub use factory::VaultFactory;
pub use ledger::{LedgerError, TokenLedger};
pub use swap_router::{RouterError, SwapRouter};
pub use vault::{Vault, VaultError, VaultSnapshot};
