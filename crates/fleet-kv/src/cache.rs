//! [`DurableCache`] trait and its NATS JetStream KV backend.

use std::time::Duration;

use async_nats::jetstream::kv::Store;
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Key/value store whose entries disappear after a per-key TTL.
///
/// A missing key and an expired key are indistinguishable to callers.
#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Drop the entry now. Expiring a missing key is not an error.
    async fn expire(&self, key: &str) -> Result<()>;
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn DurableCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    cache.set(key, bytes, ttl).await
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn DurableCache, key: &str) -> Result<Option<T>> {
    match cache.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Cache over a single JetStream KV bucket.
///
/// The bucket's `max_age` only bounds the longest TTL, so every value is
/// stored behind an 8-byte big-endian expiry (epoch millis) and checked on
/// read.
#[derive(Clone)]
pub struct NatsKvCache {
    kv: Store,
}

impl NatsKvCache {
    pub fn new(kv: Store) -> Self {
        Self { kv }
    }
}

/// NATS KV keys only allow `[-/_=.a-zA-Z0-9]`.
pub(crate) fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            ':' => '.',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_' | '=' | '.') => c,
            _ => '_',
        })
        .collect()
}

pub(crate) fn encode_entry(expires_at_ms: i64, value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + value.len());
    buf.put_i64(expires_at_ms);
    buf.put_slice(value);
    buf.freeze()
}

pub(crate) fn decode_entry(mut raw: Bytes) -> Option<(i64, Bytes)> {
    if raw.len() < 8 {
        return None;
    }
    let expires_at_ms = raw.get_i64();
    Some((expires_at_ms, raw))
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl DurableCache for NatsKvCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let key = sanitize_key(key);
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = encode_entry(now_ms().saturating_add(ttl_ms), &value);
        self.kv
            .put(&key, entry)
            .await
            .map_err(|e| Error::Kv(e.to_string()))?;
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Stored cache entry");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = sanitize_key(key);
        let raw = match self.kv.get(&key).await.map_err(|e| Error::Kv(e.to_string()))? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let (expires_at_ms, value) = decode_entry(raw).ok_or_else(|| Error::Corrupt(key.clone()))?;
        if expires_at_ms <= now_ms() {
            debug!(key = %key, "Cache entry past its TTL");
            if let Err(e) = self.kv.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to delete expired cache entry");
            }
            return Ok(None);
        }
        Ok(Some(value.to_vec()))
    }

    async fn expire(&self, key: &str) -> Result<()> {
        let key = sanitize_key(key);
        self.kv
            .delete(&key)
            .await
            .map_err(|e| Error::Kv(e.to_string()))
    }
}
