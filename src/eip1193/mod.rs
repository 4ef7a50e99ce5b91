pub mod error;

use crate::{eip1193::error::Eip1193Error, event::WalletEvent};
use async_trait::async_trait;
use ethers::{
    providers::JsonRpcClient,
    types::{Address, Signature},
    utils::{hex::decode, serialize},
};
use futures::channel::oneshot;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Object, Reflect};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;

#[wasm_bindgen]
extern "C" {
    /// `window.ethereum`
    #[derive(Clone, Debug)]
    type InjectedProvider;

    #[wasm_bindgen(catch, method)]
    async fn request(this: &InjectedProvider, args: &Object) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &InjectedProvider, event: &str, listener: &Closure<dyn FnMut(JsValue)>);
}

impl InjectedProvider {
    fn from_window() -> Result<Self, Eip1193Error> {
        let ethereum = Reflect::get(&js_sys::global(), &JsValue::from_str("ethereum"))?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return Err(Eip1193Error::JsNoEthereum);
        }
        Ok(ethereum.unchecked_into())
    }
}

/// `{ method, params }` argument of `window.ethereum.request`
fn request_args(method: &str, params: &JsValue) -> Result<Object, Eip1193Error> {
    let args = Object::new();
    Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))?;
    Reflect::set(&args, &JsValue::from_str("params"), params)?;
    Ok(args)
}

#[derive(Debug, Clone)]
// The injected provider is a JS object and therefore neither Send nor Sync.
// It is looked up on `window` every time it is needed instead of being stored.
pub(crate) struct Eip1193 {}

#[cfg_attr(target_arch = "wasm32", async_trait(? Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl JsonRpcClient for Eip1193 {
    type Error = Eip1193Error;

    /// Sends the request via `window.ethereum`
    async fn request<T: Debug + Serialize + Send + Sync, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, Self::Error> {
        let (sender, receiver) = oneshot::channel();

        let args = request_args(method, &parse_params(params)?)?;
        spawn_local(async move {
            let res = match InjectedProvider::from_window() {
                Ok(provider) => match provider.request(&args).await {
                    Ok(r) => match js_sys::JSON::stringify(&r) {
                        Ok(r) => r.as_string().ok_or(Eip1193Error::JsParseError),
                        Err(err) => Err(err.into()),
                    },
                    Err(e) => Err(e.into()),
                },
                Err(err) => Err(err),
            };
            _ = sender.send(res);
        });

        let res = receiver.await.map_err(|_| Eip1193Error::CommunicationError)?;
        Ok(serde_json::from_str(&res?)?)
    }
}

impl Default for Eip1193 {
    fn default() -> Self {
        Self::new()
    }
}

impl Eip1193 {
    pub fn new() -> Self {
        Eip1193 {}
    }

    pub fn is_available() -> bool {
        InjectedProvider::from_window().is_ok()
    }

    /// Asks the wallet for an `eth_signTypedData_v4` signature over `data`
    pub async fn sign_typed_data<T: Send + Sync + Serialize>(
        &self,
        data: T,
        from: &Address,
    ) -> Result<Signature, Eip1193Error> {
        let data = serialize(&data);
        let from = serialize(from);

        let sig: String = self.request("eth_signTypedData_v4", [from, data]).await?;
        let sig = sig.strip_prefix("0x").unwrap_or(&sig);

        let sig = decode(sig)?;
        Ok(Signature::try_from(sig.as_slice())?)
    }

    /// Registers `callback` for a wallet event. The closure lives as long as the page.
    pub fn on(
        &self,
        event: WalletEvent,
        callback: Box<dyn FnMut(JsValue)>,
    ) -> Result<(), Eip1193Error> {
        let provider = InjectedProvider::from_window()?;
        let closure = Closure::wrap(callback);
        provider.on(event.as_str(), &closure);
        closure.forget();
        Ok(())
    }
}

/// Turns request params into the JS array the wallet expects.
///
/// ethers serializes typed transaction kinds as `0x01`/`0x02`/`0x03` while injected wallets
/// only accept the short `0x1`/`0x2`/`0x3` form, so those are rewritten in place.
fn parse_params<T: Serialize + Send + Sync>(params: T) -> Result<JsValue, Eip1193Error> {
    let t_params = JsValue::from_serde(&params)?;
    if t_params.is_null() {
        return Ok(js_sys::Array::new().into());
    }

    let typename_object = JsValue::from_str("type");
    let mut error = None;
    let normalized = js_sys::Array::from(&t_params)
        .map(&mut |val, _, _| {
            let Some(trans) = js_sys::Object::try_from(&val) else {
                return val;
            };
            let Some(type_string) =
                js_sys::Reflect::get(trans, &typename_object).ok().and_then(|t| t.as_string())
            else {
                return val;
            };
            let short_type = match type_string.as_str() {
                "0x01" => "0x1",
                "0x02" => "0x2",
                "0x03" => "0x3",
                _ => return val,
            };
            let t_copy = trans.clone();
            match js_sys::Reflect::set(&t_copy, &typename_object, &JsValue::from_str(short_type)) {
                Ok(_) => t_copy.into(),
                Err(e) => {
                    error = Some(Eip1193Error::JsValueError(format!("{:?}", e)));
                    JsValue::UNDEFINED
                }
            }
        })
        .into();

    match error {
        Some(e) => Err(e),
        None => Ok(normalized),
    }
}
