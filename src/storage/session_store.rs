//! Session-store seam.
//!
//! The memory layer only cares about key layout and TTL; the transport behind
//! `SessionStore` is interchangeable. `InMemorySessionStore` is the
//! in-process implementation used by default and in tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Expiring key-value store for serialized session histories.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;

    /// Stores `value` under `key`, replacing any previous value and resetting
    /// the expiry to `ttl` from now.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), SessionStoreError>;

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError>;
}

/// In-process store with lazy expiry: entries are dropped when read past
/// their deadline.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

struct StoredEntry {
    value: String,
    expires_at: Instant,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries (test inspection).
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
