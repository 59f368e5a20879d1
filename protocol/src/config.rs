//! # Configuration & Constants
//!
//! Protocol constants live at the top of this file. Deployment parameters
//! (which tokens exist where, who the treasury is, how fast the lending
//! market accrues) live in [`DeploymentConfig`], which is plain JSON on disk.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::Address;
use crate::token::TokenQuirks;
use crate::Amount;

// ---------------------------------------------------------------------------
// Native Currency
// ---------------------------------------------------------------------------

/// Pseudo-identifier for native currency. Never a token contract and never
/// a ledger key.
pub const NATIVE_CURRENCY: Address = Address::from_bytes([0xEE; 20]);

/// Native currency decimals.
pub const NATIVE_DECIMALS: u8 = 18;

/// One whole unit of native currency in base units.
pub const ONE_NATIVE: Amount = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Swap Venue
// ---------------------------------------------------------------------------

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Fee charged by the constant-product venue on every input, in bps.
pub const SWAP_FEE_BPS: u32 = 30;

// ---------------------------------------------------------------------------
// Lending Market
// ---------------------------------------------------------------------------

/// Fixed-point scale of the receipt exchange rate.
pub const EXCHANGE_RATE_SCALE: Amount = 1_000_000_000_000_000_000;

/// Starting exchange rate: 0.02 underlying per receipt unit, adjusted for
/// the 18 → 8 decimal gap (`0.02 * 10^(18 + 18 - 8)`).
pub const INITIAL_EXCHANGE_RATE: Amount = 200_000_000_000_000_000_000_000_000;

/// Receipt token decimals.
pub const RECEIPT_DECIMALS: u8 = 8;

/// Default linear growth of the exchange rate per mined block, as a
/// fraction of [`EXCHANGE_RATE_SCALE`]. Roughly 5% a year at 12s blocks.
pub const DEFAULT_RATE_PER_BLOCK: Amount = 19_025_875_190;

// ---------------------------------------------------------------------------
// Well-known mainnet addresses
// ---------------------------------------------------------------------------

/// DAI on mainnet.
pub const MAINNET_DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
/// USDC on mainnet.
pub const MAINNET_USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
/// USDT on mainnet.
pub const MAINNET_USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
/// WETH on mainnet.
pub const MAINNET_WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

// ---------------------------------------------------------------------------
// Deployment configuration
// ---------------------------------------------------------------------------

/// Errors from loading or validating a [`DeploymentConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON is malformed or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One token the deployment knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Ticker symbol.
    pub symbol: String,
    /// Contract address.
    pub address: Address,
    /// Display decimals.
    pub decimals: u8,
    /// Behavioral quirks of the deployed contract.
    #[serde(default)]
    pub quirks: TokenQuirks,
}

/// Everything a deployment needs to wire vaults, the swap router and the
/// simulated collaborators together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Fee-routing address recorded by the factory.
    pub treasury: Address,
    /// The wrapped-native token.
    pub wrapped_native: TokenConfig,
    /// Tokens the swap paths accept as input.
    pub supported_tokens: Vec<TokenConfig>,
    /// Lending market exchange-rate growth per block.
    #[serde(default = "default_rate_per_block")]
    pub rate_per_block: Amount,
}

fn default_rate_per_block() -> Amount {
    DEFAULT_RATE_PER_BLOCK
}

impl DeploymentConfig {
    /// DAI, USDC and USDT at their mainnet addresses, with WETH as the
    /// wrapped-native token.
    pub fn mainnet_fork(treasury: Address) -> Self {
        let token = |symbol: &str, address: &str, decimals: u8, quirks: TokenQuirks| TokenConfig {
            symbol: symbol.to_string(),
            // The constants above are valid by construction.
            address: Address::from_hex(address).unwrap_or_default(),
            decimals,
            quirks,
        };
        Self {
            treasury,
            wrapped_native: token("WETH", MAINNET_WETH, 18, TokenQuirks::default()),
            supported_tokens: vec![
                token("DAI", MAINNET_DAI, 18, TokenQuirks::default()),
                token("USDC", MAINNET_USDC, 6, TokenQuirks::default()),
                token("USDT", MAINNET_USDT, 6, TokenQuirks::usdt()),
            ],
            rate_per_block: DEFAULT_RATE_PER_BLOCK,
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            tokens = config.supported_tokens.len(),
            "deployment config loaded"
        );
        Ok(config)
    }

    /// Rejects configurations the contracts cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supported_tokens.is_empty() {
            return Err(ConfigError::Invalid("supported token set is empty".into()));
        }
        let mut seen = HashSet::new();
        for token in &self.supported_tokens {
            if token.address == NATIVE_CURRENCY {
                return Err(ConfigError::Invalid(format!(
                    "{} uses the native currency pseudo-identifier",
                    token.symbol
                )));
            }
            if token.address == self.wrapped_native.address {
                return Err(ConfigError::Invalid(format!(
                    "{} is the wrapped-native token and cannot be swapped for itself",
                    token.symbol
                )));
            }
            if !seen.insert(token.address) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate token address {}",
                    token.address
                )));
            }
        }
        Ok(())
    }

    /// Addresses of the supported tokens, in configuration order.
    pub fn supported_addresses(&self) -> Vec<Address> {
        self.supported_tokens.iter().map(|t| t.address).collect()
    }

    /// Looks up a token by symbol, case-insensitively. Includes wrapped-native.
    pub fn token_by_symbol(&self, symbol: &str) -> Option<&TokenConfig> {
        std::iter::once(&self.wrapped_native)
            .chain(self.supported_tokens.iter())
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mainnet_fork_is_valid() {
        let config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        config.validate().unwrap();
        assert_eq!(config.supported_tokens.len(), 3);
        assert_eq!(
            config.token_by_symbol("usdc").unwrap().address,
            Address::from_hex(MAINNET_USDC).unwrap()
        );
        assert!(!config.token_by_symbol("USDT").unwrap().quirks.returns_value);
    }

    #[test]
    fn native_pseudo_id_is_not_zero() {
        assert!(!NATIVE_CURRENCY.is_zero());
        assert_eq!(
            NATIVE_CURRENCY,
            Address::from_hex("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE").unwrap()
        );
    }

    #[test]
    fn json_round_trip() {
        let config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back = DeploymentConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn rate_per_block_defaults_when_missing() {
        let config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        let mut value = serde_json::to_value(&config).unwrap();
        value.as_object_mut().unwrap().remove("rate_per_block");
        let back = DeploymentConfig::from_json_str(&value.to_string()).unwrap();
        assert_eq!(back.rate_per_block, DEFAULT_RATE_PER_BLOCK);
    }

    #[test]
    fn load_from_file() {
        let config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&config).unwrap().as_bytes())
            .unwrap();

        let loaded = DeploymentConfig::load(file.path()).unwrap();
        assert_eq!(loaded.treasury, config.treasury);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeploymentConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn rejects_wrapped_native_in_supported_set() {
        let mut config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        config.supported_tokens.push(config.wrapped_native.clone());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicates_and_empty_set() {
        let mut config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        config.supported_tokens.push(config.supported_tokens[0].clone());
        assert!(config.validate().is_err());

        config.supported_tokens.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_native_pseudo_id() {
        let mut config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));
        config.supported_tokens[0].address = NATIVE_CURRENCY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            DeploymentConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
