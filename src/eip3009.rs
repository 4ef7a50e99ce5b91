//! EIP-3009 `TransferWithAuthorization` messages: typed data for the wallet to sign and the
//! calls a relayer would use to consume a signed authorization.

use std::collections::BTreeMap;

use crate::contract::ContractCall;
use chrono::Utc;
use ethers::{
    abi::Token,
    types::{
        transaction::eip712::{EIP712Domain, Eip712DomainType, TypedData},
        Address, Signature, H256, U256,
    },
};
use serde_json::json;

pub const USDC_DOMAIN_NAME: &str = "USD Coin";
pub const USDC_DOMAIN_VERSION: &str = "2";
pub const BASE_CHAIN_ID: u64 = 8453;
/// Seconds an authorization stays valid after it was created
pub const AUTHORIZATION_VALIDITY_SECS: u64 = 20 * 60;
pub const PRIMARY_TYPE: &str = "TransferWithAuthorization";

pub const TRANSFER_WITH_AUTHORIZATION_FRAGMENT: &str = "function transferWithAuthorization(address from, address to, uint256 value, uint256 validAfter, uint256 validBefore, bytes32 nonce, uint8 v, bytes32 r, bytes32 s)";
pub const RECEIVE_WITH_AUTHORIZATION_FRAGMENT: &str = "function receiveWithAuthorization(address from, address to, uint256 value, uint256 validAfter, uint256 validBefore, bytes32 nonce, uint8 v, bytes32 r, bytes32 s)";

fn field(name: &str, r#type: &str) -> Eip712DomainType {
    Eip712DomainType { name: name.to_string(), r#type: r#type.to_string() }
}

fn domain_types() -> Vec<Eip712DomainType> {
    vec![
        field("name", "string"),
        field("version", "string"),
        field("chainId", "uint256"),
        field("verifyingContract", "address"),
    ]
}

fn authorization_types() -> Vec<Eip712DomainType> {
    vec![
        field("from", "address"),
        field("to", "address"),
        field("value", "uint256"),
        field("validAfter", "uint256"),
        field("validBefore", "uint256"),
        field("nonce", "bytes32"),
    ]
}

/// Signing domain of the token contract verifying the authorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip3009Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip3009Domain {
    /// Domain of USDC on Base
    pub fn usdc(token: Address) -> Self {
        Self {
            name: USDC_DOMAIN_NAME.to_string(),
            version: USDC_DOMAIN_VERSION.to_string(),
            chain_id: BASE_CHAIN_ID,
            verifying_contract: token,
        }
    }
}

impl From<&Eip3009Domain> for EIP712Domain {
    fn from(domain: &Eip3009Domain) -> Self {
        EIP712Domain {
            name: Some(domain.name.clone()),
            version: Some(domain.version.clone()),
            chain_id: Some(U256::from(domain.chain_id)),
            verifying_contract: Some(domain.verifying_contract),
            salt: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: H256,
}

impl TransferAuthorization {
    /// Authorization valid from the epoch until `now + AUTHORIZATION_VALIDITY_SECS`, with a
    /// fresh random nonce
    pub fn new(from: Address, to: Address, value: U256, now: u64) -> Self {
        Self {
            from,
            to,
            value,
            valid_after: 0,
            valid_before: now + AUTHORIZATION_VALIDITY_SECS,
            nonce: random_nonce(),
        }
    }

    /// `0x` followed by the 64 hex characters of the nonce
    pub fn nonce_hex(&self) -> String {
        format!("0x{}", hex::encode(self.nonce.as_bytes()))
    }

    pub fn typed_data(&self, domain: &Eip3009Domain) -> TypedData {
        let mut types = BTreeMap::new();
        types.insert("EIP712Domain".to_string(), domain_types());
        types.insert(PRIMARY_TYPE.to_string(), authorization_types());

        let mut message = BTreeMap::new();
        message.insert("from".to_string(), json!(self.from));
        message.insert("to".to_string(), json!(self.to));
        message.insert("value".to_string(), json!(self.value.to_string()));
        message.insert("validAfter".to_string(), json!(self.valid_after));
        message.insert("validBefore".to_string(), json!(self.valid_before));
        message.insert("nonce".to_string(), json!(self.nonce_hex()));

        TypedData {
            domain: domain.into(),
            types,
            primary_type: PRIMARY_TYPE.to_string(),
            message,
        }
    }
}

/// An authorization together with the wallet's signature over it
#[derive(Clone, Debug, PartialEq)]
pub struct SignedAuthorization {
    pub authorization: TransferAuthorization,
    pub domain: Eip3009Domain,
    pub signature: Signature,
}

impl SignedAuthorization {
    fn call(&self, fragment: &str, function_name: &str) -> ContractCall {
        let auth = &self.authorization;
        let word = |value: U256| {
            let mut bytes = [0u8; 32];
            value.to_big_endian(&mut bytes);
            Token::FixedBytes(bytes.to_vec())
        };
        ContractCall::new(
            self.domain.verifying_contract,
            fragment,
            function_name,
            vec![
                Token::Address(auth.from),
                Token::Address(auth.to),
                Token::Uint(auth.value),
                Token::Uint(U256::from(auth.valid_after)),
                Token::Uint(U256::from(auth.valid_before)),
                Token::FixedBytes(auth.nonce.as_bytes().to_vec()),
                Token::Uint(U256::from(self.signature.v)),
                word(self.signature.r),
                word(self.signature.s),
            ],
        )
    }

    /// `transferWithAuthorization` on the token, callable by anyone holding the signature
    pub fn transfer_call(&self) -> ContractCall {
        self.call(TRANSFER_WITH_AUTHORIZATION_FRAGMENT, "transferWithAuthorization")
    }

    /// `receiveWithAuthorization` on the token, callable only by the recipient
    pub fn receive_call(&self) -> ContractCall {
        self.call(RECEIVE_WITH_AUTHORIZATION_FRAGMENT, "receiveWithAuthorization")
    }
}

pub fn random_nonce() -> H256 {
    H256::from(rand::random::<[u8; 32]>())
}

/// Wall clock in unix seconds
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
