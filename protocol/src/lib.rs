// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Chamber Protocol — Chain Runtime and Collaborators
//!
//! Everything a personal token vault talks to, modeled in-process: the
//! hosting chain, the token standard, a swap venue, and a lending market.
//! The vault contracts themselves live in `chamber-contracts`.
//!
//! ## Architecture
//!
//! - **chain** — Addresses, native-currency custody, token registry, blocks, event log.
//! - **token** — The fungible-token interface, a configurable implementation
//!   (including USDT-style quirks), safe-call helpers, and wrapped native.
//! - **venue** — Constant-product swap venue paying out native or wrapped native.
//! - **lending** — Money market minting an interest-bearing receipt for native deposits.
//! - **amount** — The amount type and its JSON encoding.
//! - **math** — Overflow-safe `a * b / c` for fixed-point amounts.
//! - **config** — Protocol constants and deployment configuration.
//! - **logging** — `tracing` subscriber setup.
//!
//! Every amount is an unsigned integer quantity in the token's
//! smallest unit, represented here as [`Amount`] and carried in JSON as a
//! decimal string.

pub mod amount;
pub mod chain;
pub mod config;
pub mod lending;
pub mod logging;
pub mod math;
pub mod token;
pub mod venue;

pub use amount::Amount;
pub use chain::{Address, Chain};
pub use token::{Erc20, TokenError, TransferOutcome};
