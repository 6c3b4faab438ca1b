//! Actions awaiting a confirmation reaction.
//!
//! Two stores back each confirmation: the durable cache holds the action
//! payload under `{base}:{message_id}`, and the in-process [`PendingRegistry`]
//! holds the [`PendingMeta`] that decides whether a reaction is accepted. The
//! registry is authoritative for "still pending"; a payload missing from the
//! cache means the confirmation expired.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fleet_kv::{get_json, set_json, DurableCache};
use fleet_types::{CommandKind, PendingAction};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;

pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMeta {
    /// Epoch seconds
    pub expires_at: i64,
    pub allowed_reactions: HashSet<String>,
    pub command: CommandKind,
    pub user_id: u64,
}

/// Verdict on one inbound reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionCheck {
    /// The meta was removed; the caller owns the execution.
    Accepted(PendingMeta),
    UnknownMessage,
    WrongUser,
    WrongEmoji,
    Expired,
}

/// Process-wide map of message id to [`PendingMeta`].
///
/// The lock is never held across an `.await`.
#[derive(Default)]
pub struct PendingRegistry {
    inner: Mutex<HashMap<u64, PendingMeta>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, PendingMeta>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, message_id: u64, meta: PendingMeta) {
        self.lock().insert(message_id, meta);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate a reaction and, when it passes, remove the meta under the
    /// same lock so only one reaction per message is ever accepted.
    ///
    /// Checks run in order: user, emoji, expiry. A failed check leaves the
    /// registry untouched; expired entries are left to [`Self::reap`].
    pub fn take_if_valid(&self, message_id: u64, user_id: u64, emoji: &str, now: i64) -> ReactionCheck {
        let mut guard = self.lock();
        let meta = match guard.get(&message_id) {
            Some(meta) => meta,
            None => return ReactionCheck::UnknownMessage,
        };
        if meta.user_id != user_id {
            return ReactionCheck::WrongUser;
        }
        if !meta.allowed_reactions.contains(emoji) {
            return ReactionCheck::WrongEmoji;
        }
        if meta.expires_at <= now {
            return ReactionCheck::Expired;
        }
        match guard.remove(&message_id) {
            Some(meta) => ReactionCheck::Accepted(meta),
            None => ReactionCheck::UnknownMessage,
        }
    }

    /// Drop every meta whose deadline has passed. Returns how many went.
    pub fn reap(&self, now: i64) -> usize {
        let mut guard = self.lock();
        let before = guard.len();
        guard.retain(|_, meta| meta.expires_at > now);
        before - guard.len()
    }
}

/// Everything needed to arm one confirmation.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub message_id: u64,
    pub key: String,
    pub action: PendingAction,
    pub allowed_reactions: HashSet<String>,
    pub user_id: u64,
    pub ttl: Duration,
}

#[derive(Clone)]
pub struct PendingStore {
    cache: Arc<dyn DurableCache>,
    registry: Arc<PendingRegistry>,
    clock: Arc<dyn Clock>,
}

impl PendingStore {
    pub fn new(cache: Arc<dyn DurableCache>, registry: Arc<PendingRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            registry,
            clock,
        }
    }

    pub fn registry(&self) -> &Arc<PendingRegistry> {
        &self.registry
    }

    pub fn cache_key(base: &str, message_id: u64) -> String {
        format!("{}:{}", base, message_id)
    }

    pub async fn create_pending(&self, key: &str, action: &PendingAction, ttl: Duration) -> fleet_kv::Result<()> {
        set_json(self.cache.as_ref(), key, action, ttl).await
    }

    pub fn create_pending_meta(
        &self,
        message_id: u64,
        allowed_reactions: HashSet<String>,
        command: CommandKind,
        user_id: u64,
        ttl: Duration,
    ) {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let meta = PendingMeta {
            expires_at: self.clock.now_epoch_secs().saturating_add(ttl_secs),
            allowed_reactions,
            command,
            user_id,
        };
        self.registry.insert(message_id, meta);
    }

    /// `Ok(None)` means the payload expired or was already consumed.
    pub async fn load_pending(&self, key: &str) -> fleet_kv::Result<Option<PendingAction>> {
        get_json(self.cache.as_ref(), key).await
    }

    pub async fn discard_pending(&self, key: &str) -> fleet_kv::Result<()> {
        self.cache.expire(key).await
    }

    /// Arm a confirmation. The meta is only registered once the durable
    /// write succeeded.
    pub async fn confirm(&self, confirmation: Confirmation) -> fleet_kv::Result<()> {
        self.create_pending(&confirmation.key, &confirmation.action, confirmation.ttl)
            .await?;
        self.create_pending_meta(
            confirmation.message_id,
            confirmation.allowed_reactions,
            confirmation.action.kind(),
            confirmation.user_id,
            confirmation.ttl,
        );
        debug!(
            message_id = confirmation.message_id,
            key = %confirmation.key,
            ttl_secs = confirmation.ttl.as_secs(),
            "Confirmation armed"
        );
        Ok(())
    }

    pub fn check_reaction(&self, message_id: u64, user_id: u64, emoji: &str) -> ReactionCheck {
        self.registry
            .take_if_valid(message_id, user_id, emoji, self.clock.now_epoch_secs())
    }
}

/// Periodically purge expired metas.
pub fn spawn_reaper(registry: Arc<PendingRegistry>, clock: Arc<dyn Clock>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if registry.is_empty() {
                continue;
            }
            let reaped = registry.reap(clock.now_epoch_secs());
            if reaped > 0 {
                info!("Reaped {} expired confirmation(s)", reaped);
            }
        }
    })
}
