pub mod addresses;
pub mod chain;
pub mod contract;
pub mod eip1193;
pub mod eip3009;
pub(crate) mod event;
pub mod page;
pub mod query;
pub mod units;
pub mod wallet;

#[cfg(feature = "leptos")]
pub mod leptos;
#[cfg(feature = "yew")]
pub mod yew;

#[cfg(test)]
mod testing;

use async_trait::async_trait;
use chain::{ConfigError, WalletConfig};
use contract::CallError;
use eip1193::{error::Eip1193Error, Eip1193};
use ethers::{
    providers::{Http, JsonRpcClient, JsonRpcError, Provider, ProviderError, RpcError},
    types::{Address, Signature, U256},
};
use event::WalletEvent;
use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
    lock::Mutex,
    StreamExt,
};
use gloo_utils::format::JsValueSerdeExt;
use log::{debug, Level};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    cell::RefCell,
    fmt::{Debug, Formatter, Result as FmtResult},
    rc::Rc,
    sync::Arc,
};
use thiserror::Error;
use unsafe_send_sync::UnsafeSendSync;
use wasm_bindgen::JsValue;

pub use chain::SupportedChain;
pub use page::{Action, ActionOutcome, ActionStatus, FormState};
pub use query::{QueryClient, QueryOptions};
pub use wallet::WalletClient;

/// Console logger and panic hook for the page
pub fn init_logging(level: Level) {
    _ = console_log::init_with_level(level);
    console_error_panic_hook::set_once();
}

#[derive(Error, Debug)]
pub enum EthereumError {
    #[error("Wallet unavailable")]
    Unavailable,

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    #[error(transparent)]
    Eip1193Error(#[from] Eip1193Error),

    #[error(transparent)]
    CallError(#[from] CallError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),
}

impl EthereumError {
    /// Whether the user turned the request down in the wallet
    pub fn is_user_rejection(&self) -> bool {
        match self {
            EthereumError::Eip1193Error(e) => e.is_user_rejection(),
            EthereumError::ProviderError(ProviderError::JsonRpcClientError(e)) => e
                .as_error_response()
                .is_some_and(|e| e.code == eip1193::error::USER_REJECTED_REQUEST),
            _ => false,
        }
    }
}

impl From<EthereumError> for ProviderError {
    fn from(src: EthereumError) -> Self {
        ProviderError::JsonRpcClientError(Box::new(src))
    }
}

impl RpcError for EthereumError {
    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            EthereumError::Eip1193Error(e) => e.as_serde_error(),
            _ => None,
        }
    }

    fn is_serde_error(&self) -> bool {
        self.as_serde_error().is_some()
    }

    fn as_error_response(&self) -> Option<&JsonRpcError> {
        match self {
            EthereumError::Eip1193Error(e) => e.as_error_response(),
            _ => None,
        }
    }

    fn is_error_response(&self) -> bool {
        self.as_error_response().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected,
    ChainIdChanged(Option<u64>),
    AccountsChanged(Option<Vec<Address>>),
}

/// Connection state as seen by the UI, folded from [`Event`]s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletState {
    pub connected: bool,
    pub accounts: Option<Vec<Address>>,
    pub chain_id: Option<u64>,
}

impl WalletState {
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Connected => self.connected = true,
            Event::Disconnected => *self = WalletState::default(),
            Event::ChainIdChanged(chain_id) => self.chain_id = chain_id,
            Event::AccountsChanged(accounts) => self.accounts = accounts,
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.accounts.as_ref().and_then(|accounts| accounts.first().copied())
    }

    pub fn chain(&self) -> Option<SupportedChain> {
        self.chain_id.and_then(SupportedChain::from_id)
    }
}

#[derive(Debug, Default)]
struct Session {
    injected: bool,
    subscribed: bool,
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
}

/// Injected wallet session. Clones share the same session and event stream.
#[derive(Clone)]
pub struct Ethereum {
    config: WalletConfig,
    // wasm is single threaded; the session is only touched from the page's event loop
    session: UnsafeSendSync<Rc<RefCell<Session>>>,
    events: UnboundedSender<Event>,
    receiver: Arc<Mutex<UnboundedReceiver<Event>>>,
}

impl Debug for Ethereum {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let session = self.session.borrow();
        write!(
            f,
            "Ethereum with accounts: {:?}, chain_id: {:?} ",
            session.accounts, session.chain_id
        )
    }
}

impl Ethereum {
    pub fn new(config: WalletConfig) -> Self {
        let (events, receiver) = unbounded();
        Ethereum {
            config,
            session: UnsafeSendSync::new(Rc::new(RefCell::new(Session::default()))),
            events,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn injected_available(&self) -> bool {
        Eip1193::is_available()
    }

    pub fn is_connected(&self) -> bool {
        self.session.borrow().accounts.is_some()
    }

    pub fn accounts(&self) -> Option<Vec<Address>> {
        self.session.borrow().accounts.clone()
    }

    pub fn account(&self) -> Option<Address> {
        self.session.borrow().accounts.as_ref().and_then(|a| a.first().copied())
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.session.borrow().chain_id
    }

    /// Requests accounts from the injected wallet and starts following its events
    pub async fn connect(&self) -> Result<(), EthereumError> {
        if self.is_connected() {
            return Err(EthereumError::AlreadyConnected);
        }
        if !self.injected_available() {
            return Err(EthereumError::Unavailable);
        }

        self.session.borrow_mut().injected = true;
        let result = self.handshake().await;
        if result.is_err() {
            self.session.borrow_mut().injected = false;
        }
        result
    }

    async fn handshake(&self) -> Result<(), EthereumError> {
        let accounts: Vec<Address> = self.request("eth_requestAccounts", ()).await?;
        let chain_id = self.request::<_, U256>("eth_chainId", ()).await?.low_u64();
        {
            let mut session = self.session.borrow_mut();
            session.accounts = Some(accounts.clone());
            session.chain_id = Some(chain_id);
        }
        self.subscribe()?;

        self.emit(Event::Connected);
        self.emit(Event::ChainIdChanged(Some(chain_id)));
        self.emit(Event::AccountsChanged(Some(accounts)));
        Ok(())
    }

    /// Forgets the session. Injected wallets cannot be disconnected from the page, so the
    /// wallet itself stays authorized.
    pub fn disconnect(&self) {
        {
            let mut session = self.session.borrow_mut();
            session.injected = false;
            session.accounts = None;
            session.chain_id = None;
        }
        self.emit(Event::Disconnected);
    }

    fn subscribe(&self) -> Result<(), EthereumError> {
        if self.session.borrow().subscribed {
            return Ok(());
        }
        let injected = Eip1193::new();
        for event in WalletEvent::ALL {
            let this = self.clone();
            injected.on(event, Box::new(move |payload| this.on_wallet_event(event, payload)))?;
        }
        self.session.borrow_mut().subscribed = true;
        Ok(())
    }

    fn on_wallet_event(&self, event: WalletEvent, payload: JsValue) {
        if !self.session.borrow().injected {
            return;
        }
        debug!("Wallet event {event}");
        match event {
            WalletEvent::ChainChanged => {
                let chain_id = payload.into_serde::<U256>().ok().map(|c| c.low_u64());
                self.session.borrow_mut().chain_id = chain_id;
                self.emit(Event::ChainIdChanged(chain_id));
            }
            WalletEvent::AccountsChanged => {
                let accounts = payload.into_serde::<Vec<Address>>().ok().filter(|a| !a.is_empty());
                if accounts.is_none() {
                    // a locked wallet reports no accounts
                    self.disconnect();
                    return;
                }
                self.session.borrow_mut().accounts = accounts.clone();
                self.emit(Event::AccountsChanged(accounts));
            }
            WalletEvent::Disconnect => self.disconnect(),
        }
    }

    fn emit(&self, event: Event) {
        _ = self.events.unbounded_send(event);
    }

    /// Next connection event. Waits until one is available.
    pub async fn next(&self) -> Option<Event> {
        self.receiver.lock().await.next().await
    }

    /// Provider routing every request through the injected wallet
    pub fn provider(&self) -> Provider<Ethereum> {
        Provider::<Ethereum>::new(self.clone())
    }

    /// HTTP transport of the wallet's current chain, or of the default chain when the wallet
    /// is on an unsupported one
    pub fn transport(&self) -> Result<Provider<Http>, EthereumError> {
        let chain = self
            .chain_id()
            .and_then(|id| self.config.chain_by_id(id))
            .unwrap_or(self.config.default_chain());
        Ok(chain.transport()?)
    }

    /// Signs typed data with the wallet
    pub async fn sign_typed_data_as<T: Send + Sync + Serialize>(
        &self,
        data: T,
        from: &Address,
    ) -> Result<Signature, EthereumError> {
        if !self.session.borrow().injected {
            return Err(EthereumError::NotConnected);
        }
        Ok(Eip1193::new().sign_typed_data(data, from).await?)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl JsonRpcClient for Ethereum {
    type Error = EthereumError;

    async fn request<T: Debug + Serialize + Send + Sync, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, Self::Error> {
        if !self.session.borrow().injected {
            return Err(EthereumError::NotConnected);
        }
        Ok(Eip1193::new().request(method, params).await?)
    }
}
