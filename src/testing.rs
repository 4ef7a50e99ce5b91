use std::cell::RefCell;

use async_trait::async_trait;
use ethers::{
    abi::Token,
    providers::JsonRpcError,
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip712::TypedData, Address, Signature, TransactionReceipt, TxHash, U256,
    },
    utils::keccak256,
};

use crate::{
    contract::ContractCall,
    eip1193::error::{Eip1193Error, USER_REJECTED_REQUEST},
    wallet::WalletClient,
    EthereumError,
};

const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Clone, Debug)]
pub(crate) enum Recorded {
    Write(ContractCall),
    Read(ContractCall),
    Sign(TypedData),
    Receipt(TxHash),
}

/// Wallet double recording every request. Signs with a local dev key.
pub(crate) struct MockWallet {
    signer: Option<LocalWallet>,
    reject: bool,
    decimals: Option<u8>,
    recorded: RefCell<Vec<Recorded>>,
}

impl MockWallet {
    pub fn connected() -> Self {
        Self {
            signer: DEV_KEY.parse().ok(),
            reject: false,
            decimals: None,
            recorded: RefCell::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        Self { signer: None, ..Self::connected() }
    }

    /// Connected wallet whose user turns every request down
    pub fn rejecting() -> Self {
        Self { reject: true, ..Self::connected() }
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.borrow().clone()
    }

    pub fn writes(&self) -> Vec<ContractCall> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Write(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn signed(&self) -> Vec<TypedData> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Sign(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Recorded) -> Result<(), EthereumError> {
        self.recorded.borrow_mut().push(request);
        if self.signer.is_none() {
            return Err(EthereumError::NotConnected);
        }
        if self.reject {
            return Err(Eip1193Error::JsonRpcError(JsonRpcError {
                code: USER_REJECTED_REQUEST,
                message: "User rejected the request.".to_string(),
                data: None,
            })
            .into());
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl WalletClient for MockWallet {
    fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    fn chain_id(&self) -> Option<u64> {
        self.signer.as_ref().map(|_| 8453)
    }

    async fn write_contract(&self, call: &ContractCall) -> Result<TxHash, EthereumError> {
        self.record(Recorded::Write(call.clone()))?;
        Ok(TxHash::from(keccak256(call.calldata()?)))
    }

    async fn wait_for_receipt(
        &self,
        tx: TxHash,
    ) -> Result<Option<TransactionReceipt>, EthereumError> {
        self.record(Recorded::Receipt(tx))?;
        Ok(Some(TransactionReceipt {
            transaction_hash: tx,
            status: Some(1u64.into()),
            ..Default::default()
        }))
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, EthereumError> {
        self.record(Recorded::Sign(data.clone()))?;
        let signer = self.signer.as_ref().ok_or(EthereumError::NotConnected)?;
        signer
            .sign_typed_data(data)
            .await
            .map_err(|err| Eip1193Error::JsValueError(err.to_string()).into())
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<Vec<Token>, EthereumError> {
        self.record(Recorded::Read(call.clone()))?;
        match self.decimals {
            Some(decimals) => Ok(vec![Token::Uint(U256::from(decimals))]),
            None => Err(EthereumError::Unavailable),
        }
    }
}
