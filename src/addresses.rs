//! Preset contract and token addresses per supported network, used as form defaults.

use crate::chain::SupportedChain;
use ethers::types::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenPreset {
    pub symbol: &'static str,
    pub address: &'static str,
    pub decimals: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkAddresses {
    pub chain: SupportedChain,
    /// Deployed ContentfulSends forwarder, if one was configured for this build
    pub contentful_sends: Option<&'static str>,
    pub usdc: TokenPreset,
}

pub const USDC_BASE: TokenPreset = TokenPreset {
    symbol: "USDC",
    address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    decimals: 6,
};

pub const USDC_BASE_SEPOLIA: TokenPreset = TokenPreset {
    symbol: "USDC",
    address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
    decimals: 6,
};

pub fn network(chain: SupportedChain) -> NetworkAddresses {
    match chain {
        SupportedChain::Base => NetworkAddresses {
            chain,
            contentful_sends: std::option_env!("CONTENTFUL_SENDS_BASE"),
            usdc: USDC_BASE,
        },
        SupportedChain::BaseSepolia => NetworkAddresses {
            chain,
            contentful_sends: std::option_env!("CONTENTFUL_SENDS_BASE_SEPOLIA"),
            usdc: USDC_BASE_SEPOLIA,
        },
    }
}

/// Decimals of a preset token, if `token` is one on `chain`
pub fn preset_decimals(chain: SupportedChain, token: Address) -> Option<u8> {
    let usdc = network(chain).usdc;
    match usdc.address.parse::<Address>() {
        Ok(address) if address == token => Some(usdc.decimals),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_addresses() {
        for chain in SupportedChain::ALL {
            let addresses = network(chain);
            assert_eq!(addresses.chain, chain);
            assert!(addresses.usdc.address.parse::<Address>().is_ok());
            if let Some(contract) = addresses.contentful_sends {
                assert!(contract.parse::<Address>().is_ok());
            }
        }
    }

    #[test]
    fn preset_decimals_only_for_known_tokens() {
        let usdc = USDC_BASE.address.parse::<Address>().unwrap();

        assert_eq!(preset_decimals(SupportedChain::Base, usdc), Some(6));
        assert_eq!(preset_decimals(SupportedChain::BaseSepolia, usdc), None);
        assert_eq!(preset_decimals(SupportedChain::Base, Address::zero()), None);
    }
}
