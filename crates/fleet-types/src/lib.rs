//! Shared types for the game server fleet admin bot

pub mod actions;
pub mod errors;
pub mod events;
pub mod guild;
pub mod server;

pub use actions::{CommandKind, PendingAction, Requester};
pub use errors::RemoteFailure;
pub use events::{CommandMessage, ReactionAdded};
pub use guild::{CommandPermission, GuildFeed, GuildService};
pub use server::{BannedPlayer, GameServer, PlayerAccount};
