use contentful_sends_web::{
    addresses, init_logging,
    yew::{ConnectButton, Providers, TestPage},
    SupportedChain,
};
use log::{warn, Level};
use yew::prelude::*;

#[function_component]
fn App() -> Html {
    html! {
        <Providers>
            <ConnectButton />
            <TestPage />
        </Providers>
    }
}

fn main() {
    init_logging(Level::Debug);
    if addresses::network(SupportedChain::Base).contentful_sends.is_none() {
        warn!("CONTENTFUL_SENDS_BASE was not set at build time, enter the contract address by hand");
    }
    yew::Renderer::<App>::new().render();
}
