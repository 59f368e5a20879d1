//! Shared fixture: a local stand-in for a mainnet fork.
//!
//! DAI, USDC and USDT are deployed at their mainnet addresses (USDT with its
//! missing return values and zero-first approvals), WETH wraps the native
//! currency, every stablecoin has a funded native pool on the venue, and the
//! money market holds spare cash to pay interest. One user owns one vault.

#![allow(dead_code)]

use std::sync::Arc;

use chamber_contracts::swap_client::SupportedTokens;
use chamber_contracts::{SwapRouter, Vault, VaultError, VaultFactory};
use chamber_protocol::config::{DeploymentConfig, TokenConfig, ONE_NATIVE};
use chamber_protocol::lending::{LendingMarket, SimulatedMoneyMarket};
use chamber_protocol::logging::{init_logging, LogFormat};
use chamber_protocol::token::{force_approve, StandardToken, WrappedNative};
use chamber_protocol::venue::{ConstantProductVenue, SwapVenue};
use chamber_protocol::{Address, Amount, Chain, Erc20};

/// `n` whole tokens at `decimals`.
pub fn units(n: u128, decimals: u8) -> Amount {
    n * 10u128.pow(u32::from(decimals))
}

pub struct Fork {
    pub chain: Arc<Chain>,
    pub config: DeploymentConfig,
    pub deployer: Address,
    pub user: Address,
    pub dai: Arc<StandardToken>,
    pub usdc: Arc<StandardToken>,
    pub usdt: Arc<StandardToken>,
    pub weth: Arc<WrappedNative>,
    pub venue: Arc<ConstantProductVenue>,
    pub market: Arc<SimulatedMoneyMarket>,
    pub factory: Arc<VaultFactory>,
    pub router: Arc<SwapRouter>,
    pub vault: Arc<Vault>,
}

impl Fork {
    pub fn new() -> Self {
        let _ = init_logging("warn", LogFormat::Pretty);

        let chain = Arc::new(Chain::new());
        let deployer = Address::from_label("deployer");
        let user = Address::from_label("user");
        let lp = Address::from_label("liquidity-provider");
        let config = DeploymentConfig::mainnet_fork(Address::from_label("treasury"));

        let deploy = |cfg: &TokenConfig| {
            let token = Arc::new(StandardToken::with_quirks(
                cfg.address,
                &cfg.symbol,
                cfg.decimals,
                deployer,
                cfg.quirks,
            ));
            chain.register_token(token.clone());
            token
        };
        let symbol = |s: &str| config.token_by_symbol(s).expect("configured token");
        let dai = deploy(symbol("DAI"));
        let usdc = deploy(symbol("USDC"));
        let usdt = deploy(symbol("USDT"));

        let weth = Arc::new(WrappedNative::new(
            config.wrapped_native.address,
            &config.wrapped_native.symbol,
            chain.bank(),
        ));
        chain.register_token(weth.clone());

        let venue = ConstantProductVenue::deploy(Arc::clone(&chain), &deployer, Arc::clone(&weth));
        chain.fund(&lp, 3_000 * ONE_NATIVE).expect("fund lp");
        for token in [&dai, &usdc, &usdt] {
            let depth = units(2_000_000, token.decimals());
            token.mint(&deployer, &lp, depth).expect("mint pool depth");
            force_approve(&**token, &lp, &venue.address(), depth).expect("approve venue");
            venue
                .add_liquidity(&lp, &token.address(), depth, 1_000 * ONE_NATIVE)
                .expect("seed pool");
        }

        let market = SimulatedMoneyMarket::deploy(
            Arc::clone(&chain),
            &deployer,
            "cETH",
            config.rate_per_block,
        );
        chain
            .fund(&market.address(), 100 * ONE_NATIVE)
            .expect("seed market cash");

        let factory = VaultFactory::deploy(
            Arc::clone(&chain),
            &deployer,
            &config,
            venue.clone(),
            market.clone(),
        )
        .expect("valid config");
        let router = SwapRouter::deploy(
            Arc::clone(&chain),
            venue.clone(),
            &deployer,
            SupportedTokens::from_config(&config),
            config.wrapped_native.address,
        );

        chain.fund(&user, 100 * ONE_NATIVE).expect("fund user");
        for token in [&dai, &usdc, &usdt] {
            token
                .mint(&deployer, &user, units(10_000, token.decimals()))
                .expect("mint user balance");
        }

        let vault = factory.create_vault(&user);

        Self {
            chain,
            config,
            deployer,
            user,
            dai,
            usdc,
            usdt,
            weth,
            venue,
            market,
            factory,
            router,
            vault,
        }
    }

    /// Mints `amount` of `token` to `to`.
    pub fn mint(&self, token: &StandardToken, to: &Address, amount: Amount) {
        token.mint(&self.deployer, to, amount).expect("mint");
    }

    /// Approves the vault for `amount` of `token` from `from`, then deposits.
    pub fn deposit_from(
        &self,
        from: &Address,
        token: &dyn Erc20,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        force_approve(token, from, &self.vault.address(), amount).expect("approve vault");
        self.vault.deposit(from, &token.address(), amount)
    }

    /// Deposit by the vault owner.
    pub fn deposit(&self, token: &dyn Erc20, amount: Amount) -> Result<Amount, VaultError> {
        self.deposit_from(&self.user, token, amount)
    }
}
