use std::rc::Rc;

use crate::{
    chain::WalletConfig,
    eip3009::unix_now,
    page::{self, Action, ActionOutcome, ActionStatus, FormState},
    query::{QueryClient, QueryOptions},
    Ethereum, Event, SupportedChain, WalletState,
};
use ethers::types::Address;
use gloo::{events::EventListener, utils::window};
use log::{debug, error};
use web_sys::HtmlInputElement;
use yew::{
    function_component, html, platform::spawn_local, prelude::*, Children, ContextProvider, Html,
    Properties,
};

impl Reducible for WalletState {
    type Action = Event;

    fn reduce(self: Rc<Self>, event: Event) -> Rc<Self> {
        let mut state = (*self).clone();
        state.apply(event);
        Rc::new(state)
    }
}

#[derive(Properties, PartialEq)]
pub struct Props {
    #[prop_or_default]
    pub children: Children,
}

/// Root of the page. Provides `use_context::<UseEthereum>()` and `use_context::<QueryClient>()`.
#[function_component(Providers)]
pub fn providers(props: &Props) -> Html {
    let ethereum = use_ethereum();
    let queries = use_state(|| QueryClient::new(QueryOptions::page()));

    {
        let queries = (*queries).clone();
        use_effect_with((), move |_| {
            let listener = EventListener::new(&window(), "focus", move |_| {
                let dropped = queries.window_focused();
                if !dropped.is_empty() {
                    debug!("Dropped {} stale queries on focus", dropped.len());
                }
            });
            move || drop(listener)
        });
    }

    html! {
        <ContextProvider<UseEthereum> context={ethereum}>
            <ContextProvider<QueryClient> context={(*queries).clone()}>
                {for props.children.iter()}
            </ContextProvider<QueryClient>>
        </ContextProvider<UseEthereum>>
    }
}

#[derive(Clone, Debug)]
pub struct UseEthereum {
    pub ethereum: UseStateHandle<Ethereum>,
    pub state: UseReducerHandle<WalletState>,
}

impl PartialEq for UseEthereum {
    fn eq(&self, other: &Self) -> bool {
        *self.state == *other.state
    }
}

impl UseEthereum {
    /// Connect to the injected wallet
    pub fn connect(&self) {
        let eth = (*self.ethereum).clone();
        if !eth.injected_available() {
            error!("No injected wallet available!");
            return;
        }
        spawn_local(async move {
            if let Err(err) = eth.connect().await {
                error!("Cannot connect: {err}");
            }
        });
    }

    pub fn disconnect(&self) {
        self.ethereum.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected
    }

    pub fn account(&self) -> Option<Address> {
        self.state.account()
    }

    pub fn chain(&self) -> Option<SupportedChain> {
        self.state.chain()
    }

    /// The wallet session, usable as a [`crate::WalletClient`]
    pub fn client(&self) -> Ethereum {
        (*self.ethereum).clone()
    }
}

#[hook]
pub fn use_ethereum() -> UseEthereum {
    let ethereum = use_state(|| {
        let config = WalletConfig::from_env().unwrap_or_else(|err| {
            error!("Invalid wallet configuration, using defaults: {err}");
            WalletConfig::default()
        });
        Ethereum::new(config)
    });
    let state = use_reducer(WalletState::default);

    {
        let eth = (*ethereum).clone();
        let state = state.clone();
        yew_hooks::use_effect_once(move || {
            spawn_local(async move {
                while let Some(event) = eth.next().await {
                    state.dispatch(event);
                }
                debug!("Listener loop ended");
            });
            || {}
        });
    }

    UseEthereum { ethereum, state }
}

#[function_component(ConnectButton)]
pub fn connect_button() -> Html {
    let ethereum = use_context::<UseEthereum>()
        .expect("No ethereum found. You must wrap your components in <Providers />");

    let label = match ethereum.account() {
        Some(account) if ethereum.is_connected() => format!("{account:?}"),
        _ => "Connect wallet".to_string(),
    };
    let onclick = Callback::from(move |_: MouseEvent| {
        if ethereum.is_connected() {
            ethereum.disconnect();
        } else {
            ethereum.connect();
        }
    });

    html! { <button {onclick}>{label}</button> }
}

#[derive(Properties, PartialEq)]
struct FieldProps {
    label: &'static str,
    placeholder: &'static str,
    value: UseStateHandle<String>,
}

#[function_component(Field)]
fn field(props: &FieldProps) -> Html {
    let oninput = {
        let value = props.value.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            value.set(input.value());
        })
    };

    html! {
        <div>
            <label class="text-sm font-medium">{props.label}</label>
            <input value={(*props.value).clone()} placeholder={props.placeholder} {oninput} />
        </div>
    }
}

fn action_callback(
    action: Action,
    ethereum: &UseEthereum,
    queries: &QueryClient,
    form: FormState,
    status: UseStateHandle<ActionStatus>,
) -> Callback<MouseEvent> {
    let client = ethereum.client();
    let queries = queries.clone();
    Callback::from(move |_: MouseEvent| {
        status.set(status.submitting());
        let client = client.clone();
        let queries = queries.clone();
        let form = form.clone();
        let status = status.clone();
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
    })
}

/// Form for the ContentfulSends forwarder with its three actions
#[function_component(TestPage)]
pub fn test_page() -> Html {
    let ethereum = use_context::<UseEthereum>()
        .expect("No ethereum found. You must wrap your components in <Providers />");
    let queries = use_context::<QueryClient>()
        .expect("No query client found. You must wrap your components in <Providers />");

    let defaults = use_memo((), |_| FormState::with_defaults(SupportedChain::Base));
    let contract_address = use_state(|| defaults.contract_address.clone());
    let token_address = use_state(|| defaults.token_address.clone());
    let amount = use_state(|| defaults.amount.clone());
    let recipient = use_state(|| defaults.recipient.clone());

    let approve_status = use_state(ActionStatus::default);
    let send_status = use_state(ActionStatus::default);
    let eip3009_status = use_state(ActionStatus::default);

    let form = FormState {
        contract_address: (*contract_address).clone(),
        token_address: (*token_address).clone(),
        amount: (*amount).clone(),
        recipient: (*recipient).clone(),
    };

    let buttons = [
        (Action::Approve, approve_status),
        (Action::Send, send_status),
        (Action::Eip3009Send, eip3009_status),
    ]
    .into_iter()
    .map(|(action, status)| {
        let onclick = action_callback(action, &ethereum, &queries, form.clone(), status.clone());
        let outcome = status.last.as_ref().map(ToString::to_string).unwrap_or_default();
        html! {
            <div>
                <button {onclick} disabled={status.is_submitting()}>{action.label()}</button>
                <span>{outcome}</span>
            </div>
        }
    })
    .collect::<Html>();

    html! {
        <div class="container mx-auto p-4 max-w-2xl">
            <h2>{"Test ContentfulSends Contract"}</h2>
            <p>{"Send ERC20 tokens through the contract"}</p>
            <Field label="Contract Address" placeholder="0x..." value={contract_address} />
            <Field label="Token Address" placeholder="0x..." value={token_address} />
            <Field label="Amount" placeholder="100" value={amount} />
            <Field label="Recipient" placeholder="0x..." value={recipient} />
            <div class="flex space-x-2">{buttons}</div>
        </div>
    }
}
