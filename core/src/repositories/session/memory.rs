//! In-memory implementation of SessionStore
//!
//! Process-local and lost on restart. Suitable for tests, development, and
//! single-instance deployments. Expired entries are hidden on read and purged
//! on the next write.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::errors::StoreError;

use super::store::SessionStore;

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, Expiring<String>>,
    sets: HashMap<String, Expiring<HashSet<String>>>,
}

impl State {
    fn purge_expired(&mut self, now: Instant) {
        self.values.retain(|_, entry| entry.is_live(now));
        self.sets.retain(|_, entry| entry.is_live(now));
    }

    fn live_value(&self, key: &str, now: Instant) -> Option<&String> {
        self.values
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| &entry.value)
    }
}

/// In-memory session store backed by a single `RwLock`
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<RwLock<State>>,
}

impl InMemorySessionStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys, values and sets together
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.state.read().await;
        state.values.values().filter(|e| e.is_live(now)).count()
            + state.sets.values().filter(|e| e.is_live(now)).count()
    }

    /// Whether the store holds no live keys
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.read().await;
        Ok(state.live_value(key, Instant::now()).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.purge_expired(Instant::now());
        state
            .values
            .insert(key.to_string(), Expiring::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let value = state.values.remove(key).filter(|e| e.is_live(now)).is_some();
        let set = state.sets.remove(key).filter(|e| e.is_live(now)).is_some();
        Ok(value || set)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let state = self.state.read().await;
        Ok(state.live_value(key, now).is_some()
            || state.sets.get(key).is_some_and(|e| e.is_live(now)))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let state = self.state.read().await;
        let values = state
            .values
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone());
        let sets = state
            .sets
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone());
        Ok(values.chain(sets).collect())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let matches = match (expected, state.live_value(key, now)) {
            (None, None) => true,
            (Some(expected), Some(current)) => expected == current.as_str(),
            _ => false,
        };

        if !matches {
            return Ok(false);
        }

        state
            .values
            .insert(key.to_string(), Expiring::new(value.to_string(), ttl));
        Ok(true)
    }

    async fn set_indexed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        index_key: &str,
        index_ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.purge_expired(now);

        state
            .values
            .insert(key.to_string(), Expiring::new(value.to_string(), ttl));

        let index = state
            .sets
            .entry(index_key.to_string())
            .or_insert_with(|| Expiring::new(HashSet::new(), index_ttl));
        index.value.insert(key.to_string());
        index.expires_at = now + index_ttl;
        Ok(())
    }

    async fn index_members(&self, index_key: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .sets
            .get(index_key)
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| e.value.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn index_remove(&self, index_key: &str, member: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let Some(index) = state.sets.get_mut(index_key).filter(|e| e.is_live(now)) else {
            return Ok(false);
        };
        let removed = index.value.remove(member);
        if index.value.is_empty() {
            state.sets.remove(index_key);
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
