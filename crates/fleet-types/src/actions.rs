//! Commands and the payloads persisted while they await confirmation

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::server::GameServer;

/// Every command the bot understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Ban,
    Unban,
    Whitelist,
    Unwhitelist,
    ClearWhitelist,
    Stop,
    Restart,
    Banlist,
    GetWhitelist,
    SearchPlayers,
    RefreshBans,
    Servers,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 13] = [
        CommandKind::Ban,
        CommandKind::Unban,
        CommandKind::Whitelist,
        CommandKind::Unwhitelist,
        CommandKind::ClearWhitelist,
        CommandKind::Stop,
        CommandKind::Restart,
        CommandKind::Banlist,
        CommandKind::GetWhitelist,
        CommandKind::SearchPlayers,
        CommandKind::RefreshBans,
        CommandKind::Servers,
        CommandKind::Help,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Ban => "ban",
            CommandKind::Unban => "unban",
            CommandKind::Whitelist => "whitelist",
            CommandKind::Unwhitelist => "unwhitelist",
            CommandKind::ClearWhitelist => "clear_whitelist",
            CommandKind::Stop => "stop",
            CommandKind::Restart => "restart",
            CommandKind::Banlist => "banlist",
            CommandKind::GetWhitelist => "get_whitelist",
            CommandKind::SearchPlayers => "search_players",
            CommandKind::RefreshBans => "refresh_bans",
            CommandKind::Servers => "servers",
            CommandKind::Help => "help",
        }
    }

    /// Whether the command goes through a reaction confirmation before it runs.
    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            CommandKind::Ban
                | CommandKind::Unban
                | CommandKind::Whitelist
                | CommandKind::Unwhitelist
                | CommandKind::ClearWhitelist
                | CommandKind::Stop
                | CommandKind::Restart
                | CommandKind::RefreshBans
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The member who issued a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requester {
    pub user_id: u64,
    pub name: String,
}

/// What to do once a confirmation reaction is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    BanPlayer {
        player: String,
        servers: Vec<GameServer>,
    },
    UnbanPlayer {
        player: String,
        servers: Vec<GameServer>,
    },
    WhitelistPlayer {
        player: String,
        servers: Vec<GameServer>,
    },
    UnwhitelistPlayer {
        player: String,
        servers: Vec<GameServer>,
    },
    ClearWhitelist {
        servers: Vec<GameServer>,
    },
    StopServers {
        servers: Vec<GameServer>,
    },
    RestartServers {
        servers: Vec<GameServer>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Players missing from each server's ban list, keyed by server id.
    RefreshBans {
        servers: Vec<GameServer>,
        #[serde(with = "id_pairs")]
        server_bans: BTreeMap<u64, Vec<String>>,
    },
}

/// Integer-keyed maps as `[[id, value], ..]`.
///
/// Tagged enums buffer their fields, and the buffered form cannot turn JSON
/// object keys back into integers.
mod id_pairs {
    use std::collections::BTreeMap;

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<V: Serialize, S: Serializer>(map: &BTreeMap<u64, V>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, V: DeserializeOwned, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u64, V>, D::Error> {
        let pairs: Vec<(u64, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl PendingAction {
    pub fn kind(&self) -> CommandKind {
        match self {
            PendingAction::BanPlayer { .. } => CommandKind::Ban,
            PendingAction::UnbanPlayer { .. } => CommandKind::Unban,
            PendingAction::WhitelistPlayer { .. } => CommandKind::Whitelist,
            PendingAction::UnwhitelistPlayer { .. } => CommandKind::Unwhitelist,
            PendingAction::ClearWhitelist { .. } => CommandKind::ClearWhitelist,
            PendingAction::StopServers { .. } => CommandKind::Stop,
            PendingAction::RestartServers { .. } => CommandKind::Restart,
            PendingAction::RefreshBans { .. } => CommandKind::RefreshBans,
        }
    }

    pub fn servers(&self) -> &[GameServer] {
        match self {
            PendingAction::BanPlayer { servers, .. }
            | PendingAction::UnbanPlayer { servers, .. }
            | PendingAction::WhitelistPlayer { servers, .. }
            | PendingAction::UnwhitelistPlayer { servers, .. }
            | PendingAction::ClearWhitelist { servers }
            | PendingAction::StopServers { servers }
            | PendingAction::RestartServers { servers, .. }
            | PendingAction::RefreshBans { servers, .. } => servers,
        }
    }
}
