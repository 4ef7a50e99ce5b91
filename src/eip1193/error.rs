use ethers::prelude::{JsonRpcError, ProviderError, RpcError, SignatureError};
use gloo_utils::format::JsValueSerdeExt;
use ethers::utils::hex::FromHexError;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// EIP-1193 code for a request the user turned down in the wallet
pub const USER_REJECTED_REQUEST: i64 = 4001;

#[derive(Error, Debug)]
/// Error raised while talking to the injected wallet
pub enum Eip1193Error {
    /// Thrown if the request failed on the JS side
    #[error("JsValue error: {0}")]
    JsValueError(String),

    /// Thrown if no window.ethereum is found in DOM
    #[error("No injected wallet found")]
    JsNoEthereum,

    #[error("Cannot parse wallet response")]
    JsParseError,

    #[error(transparent)]
    /// Wallet answered with a JSON-RPC error object
    JsonRpcError(#[from] JsonRpcError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    SignatureError(#[from] SignatureError),

    #[error(transparent)]
    HexError(#[from] FromHexError),

    #[error("Communication error")]
    CommunicationError,
}

impl Eip1193Error {
    /// Whether the wallet reported that the user rejected the request
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Eip1193Error::JsonRpcError(e) if e.code == USER_REJECTED_REQUEST)
    }
}

impl RpcError for Eip1193Error {
    fn as_error_response(&self) -> Option<&JsonRpcError> {
        match self {
            Eip1193Error::JsonRpcError(e) => Some(e),
            _ => None,
        }
    }

    fn is_error_response(&self) -> bool {
        self.as_error_response().is_some()
    }

    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            Eip1193Error::SerdeJson(e) => Some(e),
            _ => None,
        }
    }

    fn is_serde_error(&self) -> bool {
        self.as_serde_error().is_some()
    }
}

impl From<JsValue> for Eip1193Error {
    fn from(src: JsValue) -> Self {
        if let Ok(message) = src.into_serde::<JsonRpcError>() {
            Eip1193Error::JsonRpcError(message)
        } else {
            Eip1193Error::JsValueError(format!("{:?}", src))
        }
    }
}

impl From<Eip1193Error> for ProviderError {
    fn from(src: Eip1193Error) -> Self {
        ProviderError::JsonRpcClientError(Box::new(src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_detected_by_code() {
        let rejected = Eip1193Error::JsonRpcError(JsonRpcError {
            code: USER_REJECTED_REQUEST,
            message: "User rejected the request.".to_string(),
            data: None,
        });
        assert!(rejected.is_user_rejection());

        let other = Eip1193Error::JsonRpcError(JsonRpcError {
            code: -32603,
            message: "Internal error".to_string(),
            data: None,
        });
        assert!(!other.is_user_rejection());
        assert!(!Eip1193Error::JsNoEthereum.is_user_rejection());
    }

    #[test]
    fn malformed_signature_hex_converts() {
        let decode = |sig: &str| -> Result<Vec<u8>, Eip1193Error> {
            Ok(ethers::utils::hex::decode(sig)?)
        };

        assert!(matches!(decode("zz"), Err(Eip1193Error::HexError(_))));
        assert_eq!(decode("0a0b").unwrap(), vec![10, 11]);
    }
}
