//! The capability the page depends on for everything that touches the wallet or the chain.

use async_trait::async_trait;
use ethers::{
    abi::Token,
    providers::{Middleware, PendingTransaction},
    types::{
        transaction::{eip2718::TypedTransaction, eip712::TypedData},
        Address, Signature, TransactionReceipt, TransactionRequest, TxHash,
    },
};
use log::{debug, info};
use serde_json::json;

use crate::{contract::ContractCall, Ethereum, EthereumError};

#[async_trait(?Send)]
pub trait WalletClient {
    /// Currently selected account of the connected wallet
    fn account(&self) -> Option<Address>;

    fn chain_id(&self) -> Option<u64>;

    /// Submits `call` as a transaction from the connected account
    async fn write_contract(&self, call: &ContractCall) -> Result<TxHash, EthereumError>;

    /// Waits until `tx` is mined. `None` if the transaction was dropped.
    async fn wait_for_receipt(&self, tx: TxHash)
        -> Result<Option<TransactionReceipt>, EthereumError>;

    /// Asks the connected account to sign `data`
    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, EthereumError>;

    /// Executes `call` without a transaction and decodes its output
    async fn read_contract(&self, call: &ContractCall) -> Result<Vec<Token>, EthereumError>;
}

#[async_trait(?Send)]
impl WalletClient for Ethereum {
    fn account(&self) -> Option<Address> {
        Ethereum::account(self)
    }

    fn chain_id(&self) -> Option<u64> {
        Ethereum::chain_id(self)
    }

    async fn write_contract(&self, call: &ContractCall) -> Result<TxHash, EthereumError> {
        let from = self.account().ok_or(EthereumError::NotConnected)?;
        let tx = TransactionRequest::new().from(from).to(call.address).data(call.calldata()?);

        info!("Sending {} to {:?}", call.function_name, call.address);
        let provider = self.provider();
        let pending = provider.send_transaction(tx, None).await?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx: TxHash,
    ) -> Result<Option<TransactionReceipt>, EthereumError> {
        let transport = self.transport()?;
        debug!("Waiting for receipt of {tx:?}");
        Ok(PendingTransaction::new(tx, &transport).await?)
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, EthereumError> {
        let from = self.account().ok_or(EthereumError::NotConnected)?;
        self.sign_typed_data_as(json!(data).to_string(), &from).await
    }

    async fn read_contract(&self, call: &ContractCall) -> Result<Vec<Token>, EthereumError> {
        let tx: TypedTransaction =
            TransactionRequest::new().to(call.address).data(call.calldata()?).into();
        let output = self.transport()?.call(&tx, None).await?;
        Ok(call.decode_output(&output)?)
    }
}
