use crate::{
    chain::WalletConfig,
    eip3009::unix_now,
    page::{self, Action, ActionOutcome, ActionStatus, FormState},
    query::{QueryClient, QueryOptions},
    Ethereum as Ethers, SupportedChain, WalletState,
};
use ethers::types::Address;
use gloo::{events::EventListener, utils::window};
use leptos::*;
use log::{debug, error};

/// Root of the page. Creates the wallet session and the query cache once and provides them
/// as `use_context::<EthereumContext>()` and `use_context::<QueryClient>()`.
#[component]
pub fn Providers(children: Children) -> impl IntoView {
    debug!("Creating providers");

    let ethereum = EthereumContext::new();
    let queries = QueryClient::new(QueryOptions::page());

    let focus_queries = queries.clone();
    let listener = EventListener::new(&window(), "focus", move |_| {
        let dropped = focus_queries.window_focused();
        if !dropped.is_empty() {
            debug!("Dropped {} stale queries on focus", dropped.len());
        }
    });
    on_cleanup(move || drop(listener));

    ethereum.listen();
    provide_context(ethereum);
    provide_context(queries);

    children()
}

/// Wallet session and its connection state for the page
#[derive(Clone, Debug)]
pub struct EthereumContext {
    ethers: Ethers,
    state: ReadSignal<WalletState>,
    set_state: WriteSignal<WalletState>,
}

impl EthereumContext {
    pub(crate) fn new() -> Self {
        let config = WalletConfig::from_env().unwrap_or_else(|err| {
            error!("Invalid wallet configuration, using defaults: {err}");
            WalletConfig::default()
        });
        let (state, set_state) = create_signal(WalletState::default());
        Self { ethers: Ethers::new(config), state, set_state }
    }

    fn listen(&self) {
        let ethers = self.ethers.clone();
        let set_state = self.set_state;
        spawn_local(async move {
            while let Some(event) = ethers.next().await {
                set_state.update(|state| state.apply(event));
            }
            debug!("Listener loop ended");
        });
    }

    /// Connect to the injected wallet
    pub fn connect(&self) {
        let ethers = self.ethers.clone();
        if !ethers.injected_available() {
            error!("No injected wallet available!");
            return;
        }
        spawn_local(async move {
            if let Err(err) = ethers.connect().await {
                error!("Cannot connect: {err}");
            }
        });
    }

    pub fn disconnect(&self) {
        self.ethers.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.state.get().connected
    }

    pub fn account(&self) -> Option<Address> {
        self.state.get().account()
    }

    pub fn chain(&self) -> Option<SupportedChain> {
        self.state.get().chain()
    }

    /// The wallet session, usable as a [`crate::WalletClient`]
    pub fn client(&self) -> Ethers {
        self.ethers.clone()
    }
}

#[component]
pub fn ConnectButton() -> impl IntoView {
    let ethereum = expect_context::<EthereumContext>();

    let label = {
        let ethereum = ethereum.clone();
        move || match ethereum.account() {
            Some(account) if ethereum.is_connected() => format!("{account:?}"),
            _ => "Connect wallet".to_string(),
        }
    };
    let on_click = move |_| {
        if ethereum.is_connected() {
            ethereum.disconnect();
        } else {
            ethereum.connect();
        }
    };

    view! { <button on:click=on_click>{label}</button> }
}

fn run_action(
    action: Action,
    ethereum: &EthereumContext,
    queries: &QueryClient,
    form: FormState,
    status: WriteSignal<ActionStatus>,
) {
    status.update(|s| *s = s.submitting());
    let client = ethereum.client();
    let queries = queries.clone();
    spawn_local(async move {
        let outcome = page::dispatch(action, &client, &queries, &form, unix_now()).await;
        if let (Action::Approve, ActionOutcome::Submitted(tx)) = (action, &outcome) {
            let tx = *tx;
            let client = client.clone();
            let queries = queries.clone();
            spawn_local(async move {
                page::track_receipt(&client, &queries, tx).await;
            });
        }
        status.set(ActionStatus::finished(outcome));
    });
}

#[component]
fn Field(
    label: &'static str,
    placeholder: &'static str,
    value: ReadSignal<String>,
    set_value: WriteSignal<String>,
) -> impl IntoView {
    view! {
        <div>
            <label class="text-sm font-medium">{label}</label>
            <input
                prop:value=value
                placeholder=placeholder
                on:input=move |ev| set_value.set(event_target_value(&ev))
            />
        </div>
    }
}

/// Form for the ContentfulSends forwarder with its three actions
#[component]
pub fn TestPage() -> impl IntoView {
    let ethereum = expect_context::<EthereumContext>();
    let queries = expect_context::<QueryClient>();

    let defaults = FormState::with_defaults(SupportedChain::Base);
    let (contract_address, set_contract_address) = create_signal(defaults.contract_address);
    let (token_address, set_token_address) = create_signal(defaults.token_address);
    let (amount, set_amount) = create_signal(defaults.amount);
    let (recipient, set_recipient) = create_signal(defaults.recipient);

    let form = move || FormState {
        contract_address: contract_address.get_untracked(),
        token_address: token_address.get_untracked(),
        amount: amount.get_untracked(),
        recipient: recipient.get_untracked(),
    };

    let buttons = Action::ALL
        .into_iter()
        .map(|action| {
            let (status, set_status) = create_signal(ActionStatus::default());
            let ethereum = ethereum.clone();
            let queries = queries.clone();
            let on_click = move |_| run_action(action, &ethereum, &queries, form(), set_status);
            let outcome = move || status.get().last.map(|outcome| outcome.to_string());
            view! {
                <div>
                    <button on:click=on_click disabled=move || status.get().is_submitting()>
                        {action.label()}
                    </button>
                    <span>{outcome}</span>
                </div>
            }
        })
        .collect_view();

    view! {
        <div class="container mx-auto p-4 max-w-2xl">
            <h2>"Test ContentfulSends Contract"</h2>
            <p>"Send ERC20 tokens through the contract"</p>
            <Field label="Contract Address" placeholder="0x..." value=contract_address set_value=set_contract_address/>
            <Field label="Token Address" placeholder="0x..." value=token_address set_value=set_token_address/>
            <Field label="Amount" placeholder="100" value=amount set_value=set_amount/>
            <Field label="Recipient" placeholder="0x..." value=recipient set_value=set_recipient/>
            <div class="flex space-x-2">{buttons}</div>
        </div>
    }
}
