//! Framework independent part of the test page: form state, the three actions and the
//! bookkeeping around them. The leptos and yew components only wire these to inputs and
//! buttons.

use std::fmt::{Display, Formatter, Result as FmtResult};

use ethers::types::{Address, TransactionReceipt, TxHash};
use log::{error, info, warn};
use thiserror::Error;

use crate::{
    addresses::{self, preset_decimals},
    chain::SupportedChain,
    contract::{self, CallError, ContractCall},
    eip3009::{Eip3009Domain, SignedAuthorization, TransferAuthorization},
    query::{QueryClient, QueryKey},
    units::{parse_amount, AmountError, DEFAULT_TOKEN_DECIMALS},
    wallet::WalletClient,
    EthereumError,
};

#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("{field} {value:?} is not an address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Wallet not connected")]
    NotConnected,

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Wallet(#[from] EthereumError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub contract_address: String,
    pub token_address: String,
    pub amount: String,
    pub recipient: String,
}

impl FormState {
    /// Form prefilled with the preset forwarder and USDC of `chain`.
    ///
    /// The forwarder address is only known when `CONTENTFUL_SENDS_BASE` (or
    /// `CONTENTFUL_SENDS_BASE_SEPOLIA`) is set at build time. Without it the contract field
    /// starts empty and Approve and Send are skipped until an address is typed in.
    pub fn with_defaults(chain: SupportedChain) -> Self {
        let network = addresses::network(chain);
        Self {
            contract_address: network.contentful_sends.unwrap_or_default().to_string(),
            token_address: network.usdc.address.to_string(),
            amount: String::new(),
            recipient: String::new(),
        }
    }

    /// Whether a field `action` cannot do without is empty
    pub fn missing_required(&self, action: Action) -> bool {
        let empty = |value: &str| value.trim().is_empty();
        empty(&self.amount)
            || match action {
                Action::Approve => empty(&self.token_address) || empty(&self.contract_address),
                Action::Send => {
                    empty(&self.recipient)
                        || empty(&self.contract_address)
                        || empty(&self.token_address)
                }
                Action::Eip3009Send => empty(&self.recipient) || empty(&self.token_address),
            }
    }

    fn address(field: &'static str, value: &str) -> Result<Address, ActionError> {
        value
            .trim()
            .parse()
            .map_err(|_| ActionError::InvalidAddress { field, value: value.to_string() })
    }

    pub fn contract(&self) -> Result<Address, ActionError> {
        Self::address("Contract address", &self.contract_address)
    }

    pub fn token(&self) -> Result<Address, ActionError> {
        Self::address("Token address", &self.token_address)
    }

    pub fn recipient(&self) -> Result<Address, ActionError> {
        Self::address("Recipient", &self.recipient)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Approve,
    Send,
    Eip3009Send,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Approve, Action::Send, Action::Eip3009Send];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Approve => "Approve",
            Action::Send => "Send",
            Action::Eip3009Send => "Send with EIP3009",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// A required field was empty, nothing was sent to the wallet
    Skipped,
    Submitted(TxHash),
    Signed(SignedAuthorization),
    Failed(String),
}

impl Display for ActionOutcome {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            ActionOutcome::Skipped => write!(f, "Fill in the required fields"),
            ActionOutcome::Submitted(tx) => write!(f, "Submitted {tx:?}"),
            ActionOutcome::Signed(signed) => write!(f, "Signed 0x{}", signed.signature),
            ActionOutcome::Failed(reason) => write!(f, "Failed: {reason}"),
        }
    }
}

impl From<Result<ActionOutcome, ActionError>> for ActionOutcome {
    fn from(result: Result<ActionOutcome, ActionError>) -> Self {
        result.unwrap_or_else(|err| ActionOutcome::Failed(err.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionState {
    #[default]
    Idle,
    Submitting,
}

/// Per-button state: whether a request is in flight and how the last one ended
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionStatus {
    pub state: ActionState,
    pub last: Option<ActionOutcome>,
}

impl ActionStatus {
    pub fn submitting(&self) -> Self {
        Self { state: ActionState::Submitting, last: self.last.clone() }
    }

    pub fn finished(outcome: ActionOutcome) -> Self {
        Self { state: ActionState::Idle, last: Some(outcome) }
    }

    pub fn is_submitting(&self) -> bool {
        self.state == ActionState::Submitting
    }
}

/// `approve(contract, amount)` on the token. `None` when a required field is empty.
pub fn build_approve(form: &FormState, decimals: u8) -> Result<Option<ContractCall>, ActionError> {
    if form.missing_required(Action::Approve) {
        return Ok(None);
    }
    let amount = parse_amount(&form.amount, decimals)?;
    Ok(Some(contract::approve(form.token()?, form.contract()?, amount)))
}

/// `sendERC20(token, recipient, amount)` on the contract. `None` when a required field is empty.
pub fn build_send(form: &FormState, decimals: u8) -> Result<Option<ContractCall>, ActionError> {
    if form.missing_required(Action::Send) {
        return Ok(None);
    }
    let amount = parse_amount(&form.amount, decimals)?;
    Ok(Some(contract::send_erc20(form.contract()?, form.token()?, form.recipient()?, amount)))
}

/// Transfer authorization from `from` to the recipient, valid until `now` plus twenty minutes.
/// `None` when a required field is empty.
pub fn build_authorization(
    form: &FormState,
    decimals: u8,
    from: Option<Address>,
    now: u64,
) -> Result<Option<(TransferAuthorization, Eip3009Domain)>, ActionError> {
    if form.missing_required(Action::Eip3009Send) {
        return Ok(None);
    }
    let from = from.ok_or(ActionError::NotConnected)?;
    let value = parse_amount(&form.amount, decimals)?;
    let authorization = TransferAuthorization::new(from, form.recipient()?, value, now);
    Ok(Some((authorization, Eip3009Domain::usdc(form.token()?))))
}

async fn submit<W: WalletClient + ?Sized>(
    wallet: &W,
    call: Option<ContractCall>,
) -> Result<ActionOutcome, ActionError> {
    match call {
        Some(call) => Ok(ActionOutcome::Submitted(wallet.write_contract(&call).await?)),
        None => Ok(ActionOutcome::Skipped),
    }
}

pub async fn approve<W: WalletClient + ?Sized>(
    wallet: &W,
    form: &FormState,
    decimals: u8,
) -> ActionOutcome {
    let result = match build_approve(form, decimals) {
        Ok(call) => submit(wallet, call).await,
        Err(err) => Err(err),
    };
    report(Action::Approve, result)
}

pub async fn send<W: WalletClient + ?Sized>(
    wallet: &W,
    form: &FormState,
    decimals: u8,
) -> ActionOutcome {
    let result = match build_send(form, decimals) {
        Ok(call) => submit(wallet, call).await,
        Err(err) => Err(err),
    };
    report(Action::Send, result)
}

/// Signs an EIP-3009 authorization. The signed authorization is returned to the caller and
/// not submitted on-chain.
pub async fn send_with_authorization<W: WalletClient + ?Sized>(
    wallet: &W,
    form: &FormState,
    decimals: u8,
    now: u64,
) -> ActionOutcome {
    let result = match build_authorization(form, decimals, wallet.account(), now) {
        Ok(Some((authorization, domain))) => {
            let data = authorization.typed_data(&domain);
            match wallet.sign_typed_data(&data).await {
                Ok(signature) => {
                    Ok(ActionOutcome::Signed(SignedAuthorization { authorization, domain, signature }))
                }
                Err(err) => {
                    error!("Error signing: {err}");
                    Err(err.into())
                }
            }
        }
        Ok(None) => Ok(ActionOutcome::Skipped),
        Err(err) => Err(err),
    };
    report(Action::Eip3009Send, result)
}

fn report(action: Action, result: Result<ActionOutcome, ActionError>) -> ActionOutcome {
    let outcome = ActionOutcome::from(result);
    match &outcome {
        ActionOutcome::Failed(reason) => error!("{} failed: {reason}", action.label()),
        ActionOutcome::Skipped => {}
        outcome => info!("{}: {outcome}", action.label()),
    }
    outcome
}

async fn read_decimals<W: WalletClient + ?Sized>(
    wallet: &W,
    token: Address,
) -> Result<u8, ActionError> {
    let call = contract::decimals(token);
    let output = wallet.read_contract(&call).await?;
    Ok(contract::decode_decimals(&call, output)?)
}

/// Decimals of `token`: the preset value for known tokens, otherwise read from the token and
/// cached. Falls back to [`DEFAULT_TOKEN_DECIMALS`] when the read fails.
pub async fn resolve_decimals<W: WalletClient + ?Sized>(
    wallet: &W,
    queries: &QueryClient,
    token: Address,
) -> u8 {
    let chain = wallet.chain_id().and_then(SupportedChain::from_id).unwrap_or(SupportedChain::Base);
    if let Some(decimals) = preset_decimals(chain, token) {
        return decimals;
    }
    let key = QueryKey::token_decimals(chain, token);
    match queries.fetch(key, || read_decimals(wallet, token)).await {
        Ok(decimals) => decimals,
        Err(err) => {
            warn!("Cannot read decimals of {token:?}, assuming {DEFAULT_TOKEN_DECIMALS}: {err}");
            DEFAULT_TOKEN_DECIMALS
        }
    }
}

/// Runs `action` against the current form. Nothing reaches the wallet when a required field
/// is empty.
pub async fn dispatch<W: WalletClient + ?Sized>(
    action: Action,
    wallet: &W,
    queries: &QueryClient,
    form: &FormState,
    now: u64,
) -> ActionOutcome {
    if form.missing_required(action) {
        return ActionOutcome::Skipped;
    }
    if action == Action::Eip3009Send && wallet.account().is_none() {
        return report(action, Err(ActionError::NotConnected));
    }
    let token = match form.token() {
        Ok(token) => token,
        Err(err) => return report(action, Err(err)),
    };
    let decimals = resolve_decimals(wallet, queries, token).await;

    match action {
        Action::Approve => approve(wallet, form, decimals).await,
        Action::Send => send(wallet, form, decimals).await,
        Action::Eip3009Send => send_with_authorization(wallet, form, decimals, now).await,
    }
}

/// Waits for the receipt of `tx`, caching and logging it
pub async fn track_receipt<W: WalletClient + ?Sized>(
    wallet: &W,
    queries: &QueryClient,
    tx: TxHash,
) -> Option<TransactionReceipt> {
    let key = QueryKey::receipt(tx);
    if let Some(receipt) = queries.get::<TransactionReceipt>(&key) {
        return Some(receipt);
    }
    match wallet.wait_for_receipt(tx).await {
        Ok(Some(receipt)) => {
            info!("Receipt for {tx:?}: status {:?}, block {:?}", receipt.status, receipt.block_number);
            queries.set(key, &receipt);
            Some(receipt)
        }
        Ok(None) => {
            warn!("Transaction {tx:?} was dropped");
            None
        }
        Err(err) => {
            error!("Receipt for {tx:?} failed: {err}");
            None
        }
    }
}
