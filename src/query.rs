//! A small keyed cache for data fetched from the chain, with a freshness window.
//!
//! Entries are stored as JSON values so one client can hold any serde type, and are shared by
//! every clone of the client.

use std::{cell::RefCell, collections::HashMap, future::Future, rc::Rc, time::Duration};

use chrono::Utc;
use derive_more::Display;
use ethers::types::{Address, TxHash};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::chain::SupportedChain;

/// Freshness window of the page's cache
pub const PAGE_STALE_TIME: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(parts: &[&str]) -> Self {
        Self(parts.join("/"))
    }

    pub fn token_decimals(chain: SupportedChain, token: Address) -> Self {
        Self::new(&["decimals", &chain.id().to_string(), &format!("{token:?}")])
    }

    pub fn receipt(tx: TxHash) -> Self {
        Self::new(&["receipt", &format!("{tx:?}")])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a fetched value is served without fetching again
    pub stale_time: Duration,
    /// Whether stale entries are dropped when the window regains focus
    pub refetch_on_window_focus: bool,
}

impl QueryOptions {
    /// Options of the page: one minute fresh, nothing refetched on focus
    pub fn page() -> Self {
        Self { stale_time: PAGE_STALE_TIME, refetch_on_window_focus: false }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { stale_time: Duration::ZERO, refetch_on_window_focus: true }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: serde_json::Value,
    updated_at: i64,
}

#[derive(Debug)]
struct QueryClientInner {
    options: QueryOptions,
    entries: RefCell<HashMap<QueryKey, CacheEntry>>,
}

#[derive(Clone, Debug)]
pub struct QueryClient {
    inner: Rc<QueryClientInner>,
}

impl PartialEq for QueryClient {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl QueryClient {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            inner: Rc::new(QueryClientInner { options, entries: RefCell::new(HashMap::new()) }),
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.inner.options
    }

    fn is_fresh(&self, entry: &CacheEntry, now: i64) -> bool {
        now - entry.updated_at < self.inner.options.stale_time.as_millis() as i64
    }

    /// Cached value for `key`, if it is still fresh
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.get_at(key, now_millis())
    }

    pub fn get_at<T: DeserializeOwned>(&self, key: &QueryKey, now: i64) -> Option<T> {
        let entries = self.inner.entries.borrow();
        let entry = entries.get(key).filter(|entry| self.is_fresh(entry, now))?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) {
        self.set_at(key, value, now_millis())
    }

    pub fn set_at<T: Serialize>(&self, key: QueryKey, value: &T, now: i64) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.inner.entries.borrow_mut().insert(key, CacheEntry { value, updated_at: now });
            }
            Err(err) => warn!("Not caching {key}: {err}"),
        }
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.inner.entries.borrow_mut().remove(key);
    }

    /// Serves `key` from the cache while fresh, otherwise runs `fetcher` and caches its result.
    /// Errors are not cached.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(&key) {
            debug!("Cache hit for {key}");
            return Ok(value);
        }
        let value = fetcher().await?;
        self.set(key, &value);
        Ok(value)
    }

    /// Called when the window regains focus. Drops stale entries so they are fetched again,
    /// unless refetching on focus is disabled. Returns the dropped keys.
    pub fn window_focused(&self) -> Vec<QueryKey> {
        self.window_focused_at(now_millis())
    }

    pub fn window_focused_at(&self, now: i64) -> Vec<QueryKey> {
        if !self.inner.options.refetch_on_window_focus {
            return Vec::new();
        }
        let mut entries = self.inner.entries.borrow_mut();
        let stale: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.remove(key);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    const MINUTE: i64 = 60_000;

    #[test]
    fn values_stay_fresh_for_the_stale_time() {
        let client = QueryClient::new(QueryOptions::page());
        let key = QueryKey::new(&["answer"]);

        client.set_at(key.clone(), &42u8, 0);

        assert_eq!(client.get_at::<u8>(&key, MINUTE - 1), Some(42));
        assert_eq!(client.get_at::<u8>(&key, MINUTE), None);
    }

    #[test]
    fn default_options_are_never_fresh() {
        let client = QueryClient::new(QueryOptions::default());
        let key = QueryKey::new(&["answer"]);

        client.set_at(key.clone(), &42u8, 0);

        assert_eq!(client.get_at::<u8>(&key, 0), None);
    }

    #[test]
    fn clones_share_entries() {
        let client = QueryClient::new(QueryOptions::page());
        let other = client.clone();

        other.set(QueryKey::new(&["shared"]), &"value");

        assert_eq!(client.get::<String>(&QueryKey::new(&["shared"])).as_deref(), Some("value"));
        assert_eq!(client, other);
        assert_ne!(client, QueryClient::new(QueryOptions::page()));
    }

    #[test]
    fn fetch_runs_fetcher_once_while_fresh() {
        let client = QueryClient::new(QueryOptions::page());
        let calls = Cell::new(0);
        let fetch = || {
            block_on(client.fetch(QueryKey::new(&["decimals"]), || async {
                calls.set(calls.get() + 1);
                Ok::<u8, ()>(18)
            }))
        };

        assert_eq!(fetch(), Ok(18));
        assert_eq!(fetch(), Ok(18));
        assert_eq!(calls.get(), 1);

        client.invalidate(&QueryKey::new(&["decimals"]));
        assert_eq!(fetch(), Ok(18));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn fetch_errors_are_not_cached() {
        let client = QueryClient::new(QueryOptions::page());
        let key = QueryKey::new(&["flaky"]);

        let failed: Result<u8, &str> = block_on(client.fetch(key.clone(), || async { Err("down") }));
        assert_eq!(failed, Err("down"));
        assert_eq!(client.get::<u8>(&key), None);
    }

    #[test]
    fn window_focus_refetch_is_disabled_for_the_page() {
        let client = QueryClient::new(QueryOptions::page());
        let key = QueryKey::new(&["answer"]);
        client.set_at(key.clone(), &1u8, 0);

        assert!(client.window_focused_at(10 * MINUTE).is_empty());
        assert!(!client.options().refetch_on_window_focus);
    }

    #[test]
    fn window_focus_drops_stale_entries_when_enabled() {
        let client = QueryClient::new(QueryOptions {
            stale_time: Duration::from_secs(60),
            refetch_on_window_focus: true,
        });
        client.set_at(QueryKey::new(&["old"]), &1u8, 0);
        client.set_at(QueryKey::new(&["new"]), &2u8, 2 * MINUTE);

        let dropped = client.window_focused_at(2 * MINUTE + 1);

        assert_eq!(dropped, vec![QueryKey::new(&["old"])]);
        assert_eq!(client.get_at::<u8>(&QueryKey::new(&["new"]), 2 * MINUTE + 1), Some(2));
    }

    #[test]
    fn keys_identify_chain_and_token() {
        let token = Address::from_low_u64_be(1);

        assert_ne!(
            QueryKey::token_decimals(SupportedChain::Base, token),
            QueryKey::token_decimals(SupportedChain::BaseSepolia, token)
        );
        assert!(QueryKey::token_decimals(SupportedChain::Base, token).to_string().starts_with("decimals/8453/0x"));
    }
}
