//! In-memory [`DurableCache`] backed by `Arc<Mutex<HashMap>>`.
//!
//! Suitable for tests and local development. Entries do not survive a
//! restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::cache::DurableCache;
use crate::error::{Error, Result};

/// Expiry uses `tokio::time::Instant`, so paused-clock tests can advance it.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Mutex<HashMap<String, (Instant, Vec<u8>)>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, (Instant, Vec<u8>)>>> {
        self.inner
            .lock()
            .map_err(|_| Error::Kv("memory cache lock poisoned".to_string()))
    }

    /// Number of entries held, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DurableCache for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + ttl;
        self.lock()?.insert(key.to_string(), (expires_at, value));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut guard = self.lock()?;
        match guard.get(key) {
            Some((expires_at, _)) if *expires_at <= Instant::now() => {
                guard.remove(key);
                Ok(None)
            }
            Some((_, value)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn expire(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
