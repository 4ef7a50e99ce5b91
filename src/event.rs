use std::fmt::Display;

/// EIP-1193 provider events the wallet session listens to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WalletEvent {
    AccountsChanged,
    ChainChanged,
    Disconnect,
}

impl WalletEvent {
    pub const ALL: [WalletEvent; 3] =
        [WalletEvent::AccountsChanged, WalletEvent::ChainChanged, WalletEvent::Disconnect];

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEvent::AccountsChanged => "accountsChanged",
            WalletEvent::ChainChanged => "chainChanged",
            WalletEvent::Disconnect => "disconnect",
        }
    }
}

impl Display for WalletEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
