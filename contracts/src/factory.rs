//! # Vault Factory
//!
//! Deploys vaults and keeps the registry used to find them. Every
//! `create_vault` call produces a new, independent vault bound to the
//! caller; an owner may hold any number of them, listed in creation order.

use std::collections::HashMap;
use std::sync::Arc;

use chamber_protocol::config::{ConfigError, DeploymentConfig};
use chamber_protocol::lending::LendingMarket;
use chamber_protocol::venue::SwapVenue;
use chamber_protocol::{Address, Chain};
use parking_lot::RwLock;
use tracing::info;

use crate::events::{self, VaultCreated};
use crate::lending_client::LendingClient;
use crate::swap_client::{SupportedTokens, SwapClient};
use crate::vault::Vault;

#[derive(Default)]
struct Registry {
    by_owner: HashMap<Address, Vec<Address>>,
    instances: HashMap<Address, Arc<Vault>>,
}

/// Creates vaults and records their owners.
pub struct VaultFactory {
    address: Address,
    treasury: Address,
    chain: Arc<Chain>,
    venue: Arc<dyn SwapVenue>,
    market: Arc<dyn LendingMarket>,
    supported: SupportedTokens,
    registry: RwLock<Registry>,
}

impl VaultFactory {
    /// Deploys a factory wired to `venue` and `market`, with the swap
    /// allow-list and treasury taken from `config`.
    pub fn deploy(
        chain: Arc<Chain>,
        deployer: &Address,
        config: &DeploymentConfig,
        venue: Arc<dyn SwapVenue>,
        market: Arc<dyn LendingMarket>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let address = chain.new_address(deployer);
        info!(
            factory = %address,
            treasury = %config.treasury,
            venue = %venue.address(),
            market = %market.address(),
            "vault factory deployed"
        );
        Ok(Arc::new(Self {
            address,
            treasury: config.treasury,
            chain,
            venue,
            market,
            supported: SupportedTokens::from_config(config),
            registry: RwLock::new(Registry::default()),
        }))
    }

    /// Deploys a new vault owned by `caller`.
    pub fn create_vault(&self, caller: &Address) -> Arc<Vault> {
        let instance = self.chain.new_address(&self.address);
        let vault = Arc::new(Vault::new(
            Arc::clone(&self.chain),
            instance,
            *caller,
            self.address,
            SwapClient::new(
                Arc::clone(&self.chain),
                Arc::clone(&self.venue),
                self.supported.clone(),
            ),
            LendingClient::new(Arc::clone(&self.chain), Arc::clone(&self.market)),
        ));

        {
            let mut registry = self.registry.write();
            registry.by_owner.entry(*caller).or_default().push(instance);
            registry.instances.insert(instance, Arc::clone(&vault));
        }

        events::emit(
            &self.chain,
            &self.address,
            &VaultCreated {
                instance,
                owner: *caller,
            },
        );
        info!(factory = %self.address, %instance, owner = %caller, "vault created");
        vault
    }

    /// Vaults created by `owner`, oldest first.
    pub fn vaults_of(&self, owner: &Address) -> Vec<Address> {
        self.registry
            .read()
            .by_owner
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    /// The vault deployed at `address` by this factory.
    pub fn vault(&self, address: &Address) -> Option<Arc<Vault>> {
        self.registry.read().instances.get(address).cloned()
    }

    pub fn vault_count(&self) -> usize {
        self.registry.read().instances.len()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Fee-routing address recorded at deployment.
    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn supported_tokens(&self) -> &SupportedTokens {
        &self.supported
    }
}

impl std::fmt::Debug for VaultFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultFactory")
            .field("address", &self.address)
            .field("treasury", &self.treasury)
            .field("vaults", &self.vault_count())
            .finish()
    }
}
