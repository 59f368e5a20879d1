//! Token quantities and their JSON form.
//!
//! Amounts routinely exceed `u64` (100 tokens at 18 decimals is `10^20`),
//! which JSON numbers and `serde_json::Value` cannot carry. On the wire they
//! are decimal strings, the way JSON-RPC clients expect them.

/// Token and native-currency quantities in smallest units.
pub type Amount = u128;

fn parse<E: serde::de::Error>(raw: &str) -> Result<Amount, E> {
    raw.parse::<Amount>()
        .map_err(|e| E::custom(format!("invalid amount {raw:?}: {e}")))
}

/// `#[serde(with = "chamber_protocol::amount::decimal")]` for one [`Amount`].
pub mod decimal {
    use super::{parse, Amount};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
    }
}

/// `#[serde(with = "chamber_protocol::amount::decimal_map")]` for an
/// address-keyed balance map.
pub mod decimal_map {
    use std::collections::BTreeMap;

    use super::{parse, Amount};
    use crate::chain::Address;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Address, Amount>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(key, &value.to_string())?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Address, Amount>, D::Error> {
        let raw: BTreeMap<Address, String> = BTreeMap::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| parse(&value).map(|amount| (key, amount)))
            .collect()
    }
}
