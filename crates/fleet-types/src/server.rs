//! Game server domain types

use serde::{Deserialize, Serialize};

/// One addressable game server in a guild's fleet.
///
/// `id` is the guild-configuration identifier; `remote_id` is the identifier
/// the hosting provider's API expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GameServer {
    pub id: u64,
    pub remote_id: i64,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl GameServer {
    pub fn new(id: u64, remote_id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            remote_id,
            name: name.into(),
            enabled: true,
        }
    }

    /// `(remote_id) - name`, the line format used in result listings.
    pub fn label(&self) -> String {
        format!("({}) - {}", self.remote_id, self.name)
    }
}

/// An entry of a server's ban list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BannedPlayer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl BannedPlayer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

/// A player account known to a server, as returned by a name search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerAccount {
    pub name: String,
    #[serde(default)]
    pub online: bool,
    /// Provider timestamp, shown verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_online: Option<String>,
}
