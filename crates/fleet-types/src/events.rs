//! Inbound chat events the bot reacts to

use serde::{Deserialize, Serialize};

use crate::actions::Requester;

/// A prefixed text message that may carry a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandMessage {
    /// `None` for direct messages
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
    pub author: Requester,
    #[serde(default)]
    pub roles: Vec<u64>,
    pub content: String,
}

/// A reaction added to some message.
///
/// `emoji` is the unicode emoji itself or the id of a custom emoji.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReactionAdded {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    /// Display name, when the platform sent the reacting member along
    #[serde(default)]
    pub user_name: Option<String>,
    pub emoji: String,
}
