//! Mock collaborators for unit tests.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use fleet_kv::DurableCache;
use fleet_types::{BannedPlayer, GameServer, GuildFeed, PlayerAccount, RemoteFailure};

use crate::chat::ChatSurface;
use crate::errors::CommandError;
use crate::gateway::GameGateway;
use crate::guilds::GuildDirectory;
use crate::paginate::Page;

// ── FailingCache ──────────────────────────────────────────────────────────────

/// Cache whose every operation fails.
pub struct FailingCache;

#[async_trait]
impl DurableCache for FailingCache {
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> fleet_kv::Result<()> {
        Err(fleet_kv::Error::Kv("bucket unavailable".to_string()))
    }

    async fn get(&self, _key: &str) -> fleet_kv::Result<Option<Vec<u8>>> {
        Err(fleet_kv::Error::Kv("bucket unavailable".to_string()))
    }

    async fn expire(&self, _key: &str) -> fleet_kv::Result<()> {
        Err(fleet_kv::Error::Kv("bucket unavailable".to_string()))
    }
}

// ── MockGuilds ────────────────────────────────────────────────────────────────

/// Serves one feed, swappable mid-test. `fail_with` makes every lookup fail.
#[derive(Clone)]
pub struct MockGuilds {
    feed: Arc<Mutex<GuildFeed>>,
    failure: Arc<Mutex<Option<String>>>,
    lookups: Arc<AtomicU64>,
}

impl MockGuilds {
    pub fn new(feed: GuildFeed) -> Self {
        Self {
            feed: Arc::new(Mutex::new(feed)),
            failure: Arc::new(Mutex::new(None)),
            lookups: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_feed(&self, feed: GuildFeed) {
        *self.feed.lock().unwrap() = feed;
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuildDirectory for MockGuilds {
    async fn guild_feed(&self, _guild_id: u64) -> Result<GuildFeed, CommandError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(CommandError::Guild(message));
        }
        Ok(self.feed.lock().unwrap().clone())
    }
}

// ── MockGame ──────────────────────────────────────────────────────────────────

/// Records calls as `"{op} {remote_id}[ {arg}]"` strings.
///
/// Failures and list contents are configured per remote id.
#[derive(Clone, Default)]
pub struct MockGame {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<i64, String>>>,
    bans: Arc<Mutex<HashMap<i64, Vec<String>>>>,
    whitelists: Arc<Mutex<HashMap<i64, Vec<String>>>>,
    accounts: Arc<Mutex<HashMap<i64, Vec<PlayerAccount>>>>,
}

impl MockGame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, remote_id: i64, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(remote_id, message.to_string());
    }

    pub fn set_bans(&self, remote_id: i64, players: &[&str]) {
        self.bans
            .lock()
            .unwrap()
            .insert(remote_id, players.iter().map(|p| p.to_string()).collect());
    }

    pub fn set_whitelist(&self, remote_id: i64, players: &[&str]) {
        self.whitelists
            .lock()
            .unwrap()
            .insert(remote_id, players.iter().map(|p| p.to_string()).collect());
    }

    pub fn set_accounts(&self, remote_id: i64, accounts: Vec<PlayerAccount>) {
        self.accounts.lock().unwrap().insert(remote_id, accounts);
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    pub fn calls_of(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .collect()
    }

    fn record(&self, op: &str, server: &GameServer, arg: Option<&str>) -> Result<(), RemoteFailure> {
        let entry = match arg {
            Some(arg) => format!("{} {} {}", op, server.remote_id, arg),
            None => format!("{} {}", op, server.remote_id),
        };
        self.calls.lock().unwrap().push(entry);
        match self.failures.lock().unwrap().get(&server.remote_id) {
            Some(message) => Err(RemoteFailure::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GameGateway for MockGame {
    async fn ban_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        self.record("ban", server, Some(player))
    }

    async fn unban_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        self.record("unban", server, Some(player))
    }

    async fn whitelist_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        self.record("whitelist", server, Some(player))
    }

    async fn unwhitelist_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        self.record("unwhitelist", server, Some(player))
    }

    async fn clear_whitelist(&self, server: &GameServer) -> Result<(), RemoteFailure> {
        self.record("clear_whitelist", server, None)
    }

    async fn stop_server(&self, server: &GameServer) -> Result<(), RemoteFailure> {
        self.record("stop", server, None)
    }

    async fn restart_server(&self, server: &GameServer, message: Option<&str>) -> Result<(), RemoteFailure> {
        self.record("restart", server, message)
    }

    async fn banlist(&self, server: &GameServer) -> Result<Vec<BannedPlayer>, RemoteFailure> {
        self.record("banlist", server, None)?;
        Ok(self
            .bans
            .lock()
            .unwrap()
            .get(&server.remote_id)
            .map(|names| names.iter().map(BannedPlayer::named).collect())
            .unwrap_or_default())
    }

    async fn whitelist(&self, server: &GameServer) -> Result<Vec<String>, RemoteFailure> {
        self.record("get_whitelist", server, None)?;
        Ok(self
            .whitelists
            .lock()
            .unwrap()
            .get(&server.remote_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Case-insensitive substring match over the accounts set for the server.
    async fn search_players(
        &self,
        server: &GameServer,
        partial_name: &str,
    ) -> Result<Vec<PlayerAccount>, RemoteFailure> {
        self.record("search_players", server, Some(partial_name))?;
        let needle = partial_name.to_lowercase();
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(&server.remote_id)
            .map(|accounts| {
                accounts
                    .iter()
                    .filter(|a| a.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ── MockChat ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SentPage {
    pub channel_id: u64,
    pub message_id: u64,
    pub page: Page,
}

/// Records pages and reactions; message ids count up from 5000.
#[derive(Clone)]
pub struct MockChat {
    sent: Arc<Mutex<Vec<SentPage>>>,
    edits: Arc<Mutex<Vec<SentPage>>>,
    reactions: Arc<Mutex<Vec<(u64, String)>>>,
    next_id: Arc<AtomicU64>,
    admin: Arc<AtomicBool>,
}

impl Default for MockChat {
    fn default() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            edits: Arc::new(Mutex::new(Vec::new())),
            reactions: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(5000)),
            admin: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_admin(&self) {
        self.admin.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentPage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent(&self) -> Option<SentPage> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn edits(&self) -> Vec<SentPage> {
        self.edits.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<(u64, String)> {
        self.reactions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.edits.lock().unwrap().clear();
        self.reactions.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatSurface for MockChat {
    async fn send_page(&self, channel_id: u64, page: &Page) -> Result<u64, CommandError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentPage {
            channel_id,
            message_id,
            page: page.clone(),
        });
        Ok(message_id)
    }

    async fn edit_page(&self, channel_id: u64, message_id: u64, page: &Page) -> Result<(), CommandError> {
        self.edits.lock().unwrap().push(SentPage {
            channel_id,
            message_id,
            page: page.clone(),
        });
        Ok(())
    }

    async fn add_reaction(&self, _channel_id: u64, message_id: u64, emoji: &str) -> Result<(), CommandError> {
        self.reactions
            .lock()
            .unwrap()
            .push((message_id, emoji.to_string()));
        Ok(())
    }

    async fn is_admin(&self, _guild_id: u64, _roles: &[u64]) -> Result<bool, CommandError> {
        Ok(self.admin.load(Ordering::SeqCst))
    }
}
