//! Reaction dispatch: turns an accepted confirmation into its action.

#[path = "reactions_tests.rs"]
mod reactions_tests;

use fleet_types::{CommandKind, ReactionAdded};
use tracing::{debug, error, info, warn};

use crate::actions;
use crate::bot::FleetBot;
use crate::chat::send_pages;
use crate::errors::CommandError;
use crate::pending::{PendingStore, ReactionCheck};

/// What became of one inbound reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// Not a confirmation we act on; nothing is shown.
    Dropped(ReactionCheck),
    /// The payload outlived its TTL; the user was asked to run the command again.
    Expired(CommandKind),
    /// Shown to the user as an error page.
    Failed(CommandKind),
    Executed(CommandKind),
}

impl FleetBot {
    pub async fn on_reaction(&self, event: &ReactionAdded) -> ReactionOutcome {
        let meta = match self
            .pending
            .check_reaction(event.message_id, event.user_id, &event.emoji)
        {
            ReactionCheck::Accepted(meta) => meta,
            other => {
                if other != ReactionCheck::UnknownMessage {
                    debug!(message_id = event.message_id, user_id = event.user_id, verdict = ?other, "Reaction dropped");
                }
                return ReactionOutcome::Dropped(other);
            }
        };

        let kind = meta.command;
        let title = self.commands.title(kind);
        let key = PendingStore::cache_key(&self.settings.confirmation(kind).base, event.message_id);
        info!(command = %kind, message_id = event.message_id, user_id = event.user_id, "Confirmation accepted");

        let action = match self.pending.load_pending(&key).await {
            Ok(Some(action)) => action,
            Ok(None) => {
                let err = CommandError::Expired { command: kind };
                self.report_error(&title, event.channel_id, &err).await;
                return ReactionOutcome::Expired(kind);
            }
            Err(e) => {
                self.report_error(&title, event.channel_id, &CommandError::Cache(e)).await;
                return ReactionOutcome::Failed(kind);
            }
        };
        if action.kind() != kind {
            warn!(key = %key, expected = %kind, found = %action.kind(), "Pending action does not match its confirmation");
            self.discard(&key).await;
            let err = CommandError::Expired { command: kind };
            self.report_error(&title, event.channel_id, &err).await;
            return ReactionOutcome::Failed(kind);
        }

        let guild_id = match event.guild_id {
            Some(id) => id,
            None => {
                self.report_error(&title, event.channel_id, &CommandError::GuildOnly).await;
                return ReactionOutcome::Failed(kind);
            }
        };

        let outcome = match actions::execute(self, guild_id, action, event.user_name.as_deref()).await {
            Ok(pages) => {
                if let Err(e) = send_pages(self.chat.as_ref(), event.channel_id, &pages).await {
                    error!(command = %kind, "Failed to send result pages: {}", e);
                }
                ReactionOutcome::Executed(kind)
            }
            Err(e) => {
                self.report_error(&title, event.channel_id, &e).await;
                ReactionOutcome::Failed(kind)
            }
        };
        self.discard(&key).await;
        outcome
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.pending.discard_pending(key).await {
            warn!(key, "Failed to discard pending action: {}", e);
        }
    }
}
