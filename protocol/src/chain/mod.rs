//! # Chain — the Hosting Runtime
//!
//! Contracts in this workspace run in-process, but they still need the
//! things a chain gives them: addresses, native-currency custody, a place
//! to find token contracts by address, a clock measured in blocks, and an
//! event log. [`Chain`] bundles those.
//!
//! ```text
//! address.rs — 20-byte identities and deterministic contract addresses
//! bank.rs    — native-currency custody (single source of truth)
//! log.rs     — typed, append-only event records
//! ```
//!
//! Calls are synchronous. A call that reaches into another contract may be
//! re-entered by that contract before it returns, exactly as on a real
//! chain, so contracts must order their own state updates around external
//! calls.

pub mod address;
pub mod bank;
pub mod log;

pub use address::{Address, AddressError};
pub use bank::{BankError, NativeBank};
pub use log::LogRecord;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::token::Erc20;
use crate::Amount;

/// The in-process host chain.
pub struct Chain {
    bank: Arc<NativeBank>,
    tokens: DashMap<Address, Arc<dyn Erc20>>,
    nonces: DashMap<Address, u64>,
    block: AtomicU64,
    logs: RwLock<Vec<LogRecord>>,
}

impl Chain {
    /// Creates an empty chain at block 0.
    pub fn new() -> Self {
        Self {
            bank: Arc::new(NativeBank::new()),
            tokens: DashMap::new(),
            nonces: DashMap::new(),
            block: AtomicU64::new(0),
            logs: RwLock::new(Vec::new()),
        }
    }

    /// Shared handle to native custody.
    pub fn bank(&self) -> Arc<NativeBank> {
        Arc::clone(&self.bank)
    }

    // -----------------------------------------------------------------------
    // Addresses
    // -----------------------------------------------------------------------

    /// Allocates the next contract address for `deployer`.
    pub fn new_address(&self, deployer: &Address) -> Address {
        let mut nonce = self.nonces.entry(*deployer).or_insert(0);
        let address = Address::derive(deployer, *nonce);
        *nonce += 1;
        address
    }

    /// Number of contracts `deployer` has created so far.
    pub fn nonce_of(&self, deployer: &Address) -> u64 {
        self.nonces.get(deployer).map(|n| *n).unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Token contracts
    // -----------------------------------------------------------------------

    /// Makes a token contract reachable at its address. A later
    /// registration at the same address replaces the earlier one.
    pub fn register_token(&self, token: Arc<dyn Erc20>) {
        tracing::debug!(token = %token.address(), symbol = token.symbol(), "token registered");
        self.tokens.insert(token.address(), token);
    }

    /// Resolves the token contract at `address`.
    pub fn token(&self, address: &Address) -> Option<Arc<dyn Erc20>> {
        self.tokens.get(address).map(|t| Arc::clone(t.value()))
    }

    // -----------------------------------------------------------------------
    // Native currency
    // -----------------------------------------------------------------------

    /// Native balance of `holder`.
    pub fn native_balance(&self, holder: &Address) -> Amount {
        self.bank.balance_of(holder)
    }

    /// Moves native currency. Recipients never refuse incoming value.
    pub fn send_native(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), BankError> {
        self.bank.transfer(from, to, amount)
    }

    /// Genesis funding for an account.
    pub fn fund(&self, to: &Address, amount: Amount) -> Result<Amount, BankError> {
        self.bank.mint(to, amount)
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    /// Current block height.
    pub fn block_number(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }

    /// Advances the chain by `blocks` and returns the new height.
    pub fn mine(&self, blocks: u64) -> u64 {
        self.block.fetch_add(blocks, Ordering::SeqCst) + blocks
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Appends an event. Payloads that fail to serialize are recorded as
    /// `null` rather than aborting the emitting operation.
    pub fn emit<T: Serialize>(&self, emitter: &Address, name: &str, payload: &T) -> Uuid {
        let data = serde_json::to_value(payload).unwrap_or_else(|e| {
            tracing::warn!(event = name, error = %e, "event payload not serializable");
            serde_json::Value::Null
        });
        let record = LogRecord {
            id: Uuid::new_v4(),
            block: self.block_number(),
            emitter: *emitter,
            name: name.to_string(),
            data,
            emitted_at: Utc::now(),
        };
        let id = record.id;
        self.logs.write().push(record);
        id
    }

    /// Every event emitted so far, oldest first.
    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs.read().clone()
    }

    /// Events with the given name, oldest first.
    pub fn logs_named(&self, name: &str) -> Vec<LogRecord> {
        self.logs
            .read()
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("block", &self.block_number())
            .field("tokens", &self.tokens.len())
            .field("logs", &self.logs.read().len())
            .finish()
    }
}
