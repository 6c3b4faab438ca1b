//! Shared bot state reachable from every serenity event.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fleet_types::CommandKind;
use serenity::prelude::TypeMapKey;
use tracing::{debug, error, warn};

use crate::chat::ChatSurface;
use crate::commands::CommandRegistry;
use crate::config::{Config, ConfirmationConfig, DeadlineConfig};
use crate::errors::CommandError;
use crate::gateway::GameGateway;
use crate::guilds::GuildDirectory;
use crate::paginate::{PageHeader, PageLimits};
use crate::pending::PendingStore;
use crate::views;

/// Settings the command layer reads on every invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub prefix: String,
    pub documentation_url: Option<String>,
    pub guild_service: String,
    pub limits: PageLimits,
    pub deadlines: DeadlineConfig,
    confirmations: BTreeMap<CommandKind, ConfirmationConfig>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefix: config.discord.prefix.clone(),
            documentation_url: config.discord.documentation_url.clone(),
            guild_service: config.services.guild_service.clone(),
            limits: config.pagination,
            deadlines: config.deadlines,
            confirmations: CommandKind::ALL
                .into_iter()
                .filter(CommandKind::needs_confirmation)
                .map(|kind| (kind, config.confirmation(kind)))
                .collect(),
        }
    }

    pub fn confirmation(&self, kind: CommandKind) -> ConfirmationConfig {
        self.confirmations
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ConfirmationConfig::for_kind(kind))
    }
}

pub struct FleetBot {
    pub(crate) game: Arc<dyn GameGateway>,
    pub(crate) guilds: Arc<dyn GuildDirectory>,
    pub(crate) chat: Arc<dyn ChatSurface>,
    pub(crate) pending: PendingStore,
    pub(crate) commands: CommandRegistry,
    pub(crate) settings: Settings,
    bot_user_id: AtomicU64,
}

impl TypeMapKey for FleetBot {
    type Value = Arc<FleetBot>;
}

impl FleetBot {
    pub fn new(
        game: Arc<dyn GameGateway>,
        guilds: Arc<dyn GuildDirectory>,
        chat: Arc<dyn ChatSurface>,
        pending: PendingStore,
        config: &Config,
    ) -> Self {
        Self {
            game,
            guilds,
            chat,
            pending,
            commands: CommandRegistry::new(&config.commands),
            settings: Settings::from_config(config),
            bot_user_id: AtomicU64::new(0),
        }
    }

    /// Store the bot's own user id (called from the ready handler)
    pub fn set_bot_user_id(&self, id: u64) {
        self.bot_user_id.store(id, Ordering::Relaxed);
    }

    /// True for events the bot caused itself.
    pub fn is_self(&self, user_id: u64) -> bool {
        let own = self.bot_user_id.load(Ordering::Relaxed);
        own != 0 && own == user_id
    }

    /// Header shared by every page a command produces.
    pub(crate) fn header(&self, title: &str, description: impl Into<String>, requester: Option<&str>) -> PageHeader {
        let header = PageHeader::new(title, description).with_url(self.settings.documentation_url.clone());
        match requester {
            Some(name) => header.with_footer(format!("Executed by {}", name)),
            None => header,
        }
    }

    /// Log `err` and show it as an error page.
    pub(crate) async fn report_error(&self, title: &str, channel_id: u64, err: &CommandError) {
        if err.is_rate_limited() {
            warn!(command = title, channel_id, "Rate limited, not sending error page");
            return;
        }
        if err.is_internal() {
            error!(command = title, channel_id, "Command failed: {}", err);
        } else {
            debug!(command = title, channel_id, "Command rejected: {}", err);
        }
        let page = views::error_page(title, err, self.settings.documentation_url.clone());
        if let Err(e) = self.chat.send_page(channel_id, &page).await {
            error!(command = title, channel_id, "Failed to send error page: {}", e);
        }
    }
}
