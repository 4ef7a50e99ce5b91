//! Chains the harness can talk to and the JSON-RPC transport used for each of them.

use derive_more::Display;
use ethers::providers::{Http, Provider};
use log::debug;
use thiserror::Error;
use url::Url;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    #[display(fmt = "Base")]
    Base,
    #[display(fmt = "Base Sepolia")]
    BaseSepolia,
}

impl SupportedChain {
    pub const ALL: [SupportedChain; 2] = [SupportedChain::Base, SupportedChain::BaseSepolia];

    pub fn id(&self) -> u64 {
        match self {
            SupportedChain::Base => 8453,
            SupportedChain::BaseSepolia => 84532,
        }
    }

    pub fn from_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.id() == chain_id)
    }

    /// Public RPC endpoint used when no override was configured at build time
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            SupportedChain::Base => "https://mainnet.base.org",
            SupportedChain::BaseSepolia => "https://sepolia.base.org",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid RPC url for {chain}: {source}")]
    InvalidRpcUrl {
        chain: SupportedChain,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChainConfig {
    pub chain: SupportedChain,
    pub rpc_url: String,
}

impl ChainConfig {
    fn new(chain: SupportedChain, rpc_url: &str) -> Result<Self, ConfigError> {
        Url::parse(rpc_url).map_err(|source| ConfigError::InvalidRpcUrl { chain, source })?;
        Ok(Self { chain, rpc_url: rpc_url.to_string() })
    }

    /// HTTP provider for reads and receipt polling on this chain
    pub fn transport(&self) -> Result<Provider<Http>, ConfigError> {
        let url = Url::parse(&self.rpc_url)
            .map_err(|source| ConfigError::InvalidRpcUrl { chain: self.chain, source })?;
        Ok(Provider::new(Http::new(url)))
    }
}

/// Wallet/chain configuration shared by the whole page. Always holds exactly one entry per
/// [`SupportedChain`], the first one being the default.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletConfig {
    chains: [ChainConfig; 2],
}

impl WalletConfig {
    pub fn chains(&self) -> &[ChainConfig] {
        &self.chains
    }

    pub fn default_chain(&self) -> &ChainConfig {
        &self.chains[0]
    }

    pub fn chain(&self, chain: SupportedChain) -> &ChainConfig {
        match chain {
            SupportedChain::Base => &self.chains[0],
            SupportedChain::BaseSepolia => &self.chains[1],
        }
    }

    pub fn chain_by_id(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains().iter().find(|config| config.chain.id() == chain_id)
    }

    /// Configuration with the build-time RPC overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = WalletConfigBuilder::new();

        if let Some(rpc_url) = std::option_env!("BASE_RPC_URL") {
            builder.rpc_url(SupportedChain::Base, rpc_url);
        }
        if let Some(rpc_url) = std::option_env!("BASE_SEPOLIA_RPC_URL") {
            builder.rpc_url(SupportedChain::BaseSepolia, rpc_url);
        }

        builder.build()
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        let config = |chain: SupportedChain| ChainConfig {
            chain,
            rpc_url: chain.default_rpc_url().to_string(),
        };
        Self { chains: [config(SupportedChain::Base), config(SupportedChain::BaseSepolia)] }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WalletConfigBuilder {
    base_rpc: Option<String>,
    base_sepolia_rpc: Option<String>,
}

impl WalletConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rpc_url(&mut self, chain: SupportedChain, rpc_url: &str) -> &mut Self {
        let slot = match chain {
            SupportedChain::Base => &mut self.base_rpc,
            SupportedChain::BaseSepolia => &mut self.base_sepolia_rpc,
        };
        *slot = Some(rpc_url.to_string());
        self
    }

    pub fn build(&self) -> Result<WalletConfig, ConfigError> {
        let config = |chain: SupportedChain, rpc: &Option<String>| {
            let raw = rpc.as_deref().unwrap_or(chain.default_rpc_url());
            debug!("{chain} transport at {raw}");
            ChainConfig::new(chain, raw)
        };

        Ok(WalletConfig {
            chains: [
                config(SupportedChain::Base, &self.base_rpc)?,
                config(SupportedChain::BaseSepolia, &self.base_sepolia_rpc)?,
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_two_chains_with_default_transports() {
        let config = WalletConfigBuilder::new().build().unwrap();

        let ids: Vec<u64> = config.chains().iter().map(|c| c.chain.id()).collect();
        assert_eq!(ids, vec![8453, 84532]);
        assert_eq!(config.default_chain().chain, SupportedChain::Base);
        assert_eq!(config.chain(SupportedChain::BaseSepolia).rpc_url, "https://sepolia.base.org");
        assert_eq!(config, WalletConfig::default());
    }

    #[test]
    fn rpc_override_replaces_only_its_chain() {
        let config = WalletConfigBuilder::new()
            .rpc_url(SupportedChain::Base, "http://localhost:8545")
            .build()
            .unwrap();

        assert_eq!(config.chain(SupportedChain::Base).rpc_url, "http://localhost:8545");
        assert_eq!(config.chain(SupportedChain::BaseSepolia).rpc_url, "https://sepolia.base.org");
    }

    #[test]
    fn invalid_override_is_reported_with_its_chain() {
        let err = WalletConfigBuilder::new()
            .rpc_url(SupportedChain::BaseSepolia, "not a url")
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidRpcUrl { chain: SupportedChain::BaseSepolia, .. }));
    }

    #[test]
    fn chain_lookup_by_id() {
        let config = WalletConfig::default();

        assert_eq!(SupportedChain::from_id(8453), Some(SupportedChain::Base));
        assert_eq!(config.chain_by_id(84532).map(|c| c.chain), Some(SupportedChain::BaseSepolia));
        assert!(config.chain_by_id(1).is_none());
        assert!(config.chain(SupportedChain::Base).transport().is_ok());
        assert_eq!(SupportedChain::BaseSepolia.to_string(), "Base Sepolia");
    }
}
