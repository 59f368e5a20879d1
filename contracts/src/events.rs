//! Event payloads emitted by the contracts in this crate.
//!
//! Each payload knows its own name, so emitters and readers agree on it:
//!
//! ```ignore
//! let deposits: Vec<Deposited> = chain
//!     .logs_named(Deposited::NAME)
//!     .iter()
//!     .filter_map(|r| r.decode().ok())
//!     .collect();
//! ```

use chamber_protocol::amount::decimal;
use chamber_protocol::{Address, Amount, Chain};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed event payload.
pub trait Event: Serialize + DeserializeOwned {
    /// Name the event is logged under.
    const NAME: &'static str;
}

/// Appends `event` to the chain log under its own name.
pub(crate) fn emit<E: Event>(chain: &Chain, emitter: &Address, event: &E) -> Uuid {
    chain.emit(emitter, E::NAME, event)
}

macro_rules! event {
    ($ty:ident) => {
        impl Event for $ty {
            const NAME: &'static str = stringify!($ty);
        }
    };
}

/// A factory created a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCreated {
    pub instance: Address,
    pub owner: Address,
}
event!(VaultCreated);

/// Tokens pulled into a vault and credited to its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub token: Address,
    pub from: Address,
    /// Amount credited, which is what actually arrived.
    #[serde(with = "decimal")]
    pub amount: Amount,
}
event!(Deposited);

/// Tokens pushed from a vault to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawn {
    pub token: Address,
    pub to: Address,
    #[serde(with = "decimal")]
    pub amount: Amount,
    #[serde(with = "decimal")]
    pub remaining: Amount,
}
event!(Withdrawn);

/// Native currency pushed from a vault to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeWithdrawn {
    pub to: Address,
    #[serde(with = "decimal")]
    pub amount: Amount,
}
event!(NativeWithdrawn);

/// A tracked token balance sold for native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoughtNative {
    pub token: Address,
    #[serde(with = "decimal")]
    pub amount_in: Amount,
    #[serde(with = "decimal")]
    pub proceeds: Amount,
}
event!(BoughtNative);

/// Native currency supplied to the lending market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppliedNative {
    pub market: Address,
    #[serde(with = "decimal")]
    pub amount: Amount,
    #[serde(with = "decimal")]
    pub receipt_minted: Amount,
}
event!(SuppliedNative);

/// Receipt tokens redeemed for native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemedNative {
    pub market: Address,
    #[serde(with = "decimal")]
    pub receipt_amount: Amount,
    #[serde(with = "decimal")]
    pub received: Amount,
}
event!(RedeemedNative);

/// The router converted a caller's tokens into wrapped native.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwappedForWrapped {
    pub caller: Address,
    pub token: Address,
    #[serde(with = "decimal")]
    pub amount_in: Amount,
    #[serde(with = "decimal")]
    pub amount_out: Amount,
}
event!(SwappedForWrapped);
