//! Contract call descriptors: a target address, a minimal human readable ABI fragment and the
//! argument list, handed as one unit to the wallet.

use ethers::{
    abi::{parse_abi, Function, ParseError, Token},
    types::{Address, Bytes, U256},
};
use thiserror::Error;

pub const APPROVE_FRAGMENT: &str =
    "function approve(address spender, uint256 amount) returns (bool)";
pub const SEND_ERC20_FRAGMENT: &str =
    "function sendERC20(address token, address to, uint256 amount)";
pub const DECIMALS_FRAGMENT: &str = "function decimals() view returns (uint8)";

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Cannot parse ABI fragment {fragment:?}: {source}")]
    Fragment {
        fragment: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Abi(#[from] ethers::abi::Error),

    #[error("Unexpected output from {0}")]
    UnexpectedOutput(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContractCall {
    pub address: Address,
    pub fragment: String,
    pub function_name: String,
    pub args: Vec<Token>,
}

impl ContractCall {
    pub fn new(address: Address, fragment: &str, function_name: &str, args: Vec<Token>) -> Self {
        Self {
            address,
            fragment: fragment.to_string(),
            function_name: function_name.to_string(),
            args,
        }
    }

    pub fn function(&self) -> Result<Function, CallError> {
        let abi = parse_abi(&[self.fragment.as_str()]).map_err(|source| CallError::Fragment {
            fragment: self.fragment.clone(),
            source,
        })?;
        Ok(abi.function(&self.function_name)?.clone())
    }

    /// ABI encoded selector and arguments
    pub fn calldata(&self) -> Result<Bytes, CallError> {
        Ok(self.function()?.encode_input(&self.args)?.into())
    }

    pub fn decode_output(&self, output: &[u8]) -> Result<Vec<Token>, CallError> {
        Ok(self.function()?.decode_output(output)?)
    }
}

/// ERC-20 `approve(spender, amount)` on `token`
pub fn approve(token: Address, spender: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        token,
        APPROVE_FRAGMENT,
        "approve",
        vec![Token::Address(spender), Token::Uint(amount)],
    )
}

/// ContentfulSends `sendERC20(token, to, amount)` on `contract`
pub fn send_erc20(contract: Address, token: Address, to: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        contract,
        SEND_ERC20_FRAGMENT,
        "sendERC20",
        vec![Token::Address(token), Token::Address(to), Token::Uint(amount)],
    )
}

/// ERC-20 `decimals()` on `token`
pub fn decimals(token: Address) -> ContractCall {
    ContractCall::new(token, DECIMALS_FRAGMENT, "decimals", vec![])
}

/// Reads the result of a `decimals()` call
pub fn decode_decimals(call: &ContractCall, output: Vec<Token>) -> Result<u8, CallError> {
    output
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .and_then(|value| (value <= U256::from(u8::MAX)).then(|| value.low_u64() as u8))
        .ok_or_else(|| CallError::UnexpectedOutput(call.function_name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{abi::encode, utils::id};

    fn address(last: u8) -> Address {
        Address::from_low_u64_be(last as u64)
    }

    #[test]
    fn approve_calldata_is_selector_and_args() {
        let call = approve(address(1), address(2), U256::from(50_000_000u64));

        let calldata = call.calldata().unwrap();

        assert_eq!(&calldata[..4], &[0x09u8, 0x5e, 0xa7, 0xb3]);
        assert_eq!(&calldata[4..], encode(&call.args).as_slice());
        assert_eq!(call.address, address(1));
    }

    #[test]
    fn send_erc20_calldata_uses_its_signature() {
        let call = send_erc20(address(1), address(2), address(3), U256::from(10_000_000u64));

        let calldata = call.calldata().unwrap();

        assert_eq!(&calldata[..4], &id("sendERC20(address,address,uint256)"));
        assert_eq!(call.function_name, "sendERC20");
        assert_eq!(
            call.args,
            vec![
                Token::Address(address(2)),
                Token::Address(address(3)),
                Token::Uint(U256::from(10_000_000u64)),
            ]
        );
    }

    #[test]
    fn wrong_arguments_do_not_encode() {
        let mut call = approve(address(1), address(2), U256::one());
        call.args.pop();

        assert!(matches!(call.calldata(), Err(CallError::Abi(_))));
    }

    #[test]
    fn decimals_output_is_decoded() {
        let call = decimals(address(1));
        let output = encode(&[Token::Uint(U256::from(18u64))]);

        let tokens = call.decode_output(&output).unwrap();

        assert_eq!(decode_decimals(&call, tokens).unwrap(), 18);
        assert!(decode_decimals(&call, vec![]).is_err());
        assert!(decode_decimals(&call, vec![Token::Uint(U256::from(300u64))]).is_err());
    }
}
