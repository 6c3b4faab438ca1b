//! Guild configuration as served by the guild-configuration service

use serde::{Deserialize, Serialize};

use crate::server::GameServer;

/// A role granted the use of one command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandPermission {
    pub command: String,
    pub role_id: u64,
}

/// A bot product the guild subscribed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildService {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuildFeed {
    pub guild_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub services: Vec<GuildService>,
    #[serde(default)]
    pub servers: Vec<GameServer>,
    #[serde(default)]
    pub permissions: Vec<CommandPermission>,
}

impl GuildFeed {
    /// Checks the guild may use `service`; the error text is user-facing.
    pub fn validate_service(&self, service: &str) -> Result<(), &'static str> {
        match self.services.iter().find(|s| s.name == service) {
            Some(s) if s.enabled => Ok(()),
            _ => Err("Discord server is not enabled to use this bot"),
        }
    }

    /// True when one of `roles` was granted `command`.
    pub fn is_approved(&self, command: &str, roles: &[u64]) -> bool {
        self.permissions
            .iter()
            .any(|p| p.command == command && roles.contains(&p.role_id))
    }

    pub fn enabled_servers(&self) -> impl Iterator<Item = &GameServer> {
        self.servers.iter().filter(|s| s.enabled)
    }

    /// Enabled servers, narrowed to the one whose remote id matches when given.
    pub fn select_targets(&self, remote_id: Option<i64>) -> Vec<GameServer> {
        self.enabled_servers()
            .filter(|s| remote_id.map_or(true, |id| s.remote_id == id))
            .cloned()
            .collect()
    }

    /// Re-validates servers remembered earlier against the current feed.
    ///
    /// Keeps the cached order and returns the feed's copy of each server so
    /// renamed servers show their current name.
    pub fn still_enabled(&self, cached: &[GameServer]) -> Vec<GameServer> {
        cached
            .iter()
            .filter_map(|c| self.enabled_servers().find(|s| s.id == c.id))
            .cloned()
            .collect()
    }
}
