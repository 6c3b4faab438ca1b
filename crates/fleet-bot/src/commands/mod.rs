//! Prefix commands: lookup, validation, authorization and routing.


mod help;
mod lists;
mod players;
mod refresh;
mod search;
mod servers;

use std::collections::HashSet;

use fleet_types::{CommandKind, CommandMessage, GuildFeed, PendingAction};
use tracing::{debug, error, info, warn};

use crate::bot::FleetBot;
use crate::chat::{emoji_key, parse_reaction, send_pages};
use crate::config::CommandConfig;
use crate::errors::CommandError;
use crate::guilds::load_feed;
use crate::paginate::Page;
use crate::pending::{Confirmation, PendingStore};
use crate::views;

/// What a command hands back to the router.
#[derive(Debug)]
pub enum Reply {
    Pages(Vec<Page>),
    /// Pages ending in the prompt that awaits the confirmation reaction.
    Confirm { pages: Vec<Page>, action: PendingAction },
}

/// Everything a command body needs about the invocation.
pub(crate) struct Invocation<'a> {
    pub spec: &'a CommandConfig,
    pub msg: &'a CommandMessage,
    pub args: &'a [String],
    pub feed: GuildFeed,
}

impl Invocation<'_> {
    pub fn requester(&self) -> &str {
        &self.msg.author.name
    }
}

/// Command table: built-in defaults, then per-kind overrides from config.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    specs: Vec<CommandConfig>,
}

impl CommandRegistry {
    pub fn new(overrides: &[CommandConfig]) -> Self {
        let mut specs = default_commands();
        for o in overrides {
            match specs.iter_mut().find(|s| s.kind == o.kind) {
                Some(spec) => *spec = o.clone(),
                None => specs.push(o.clone()),
            }
        }
        Self { specs }
    }

    /// Case-insensitive lookup by long or short name.
    pub fn find(&self, name: &str) -> Option<&CommandConfig> {
        let name = name.to_lowercase();
        self.specs.iter().find(|s| {
            s.long.eq_ignore_ascii_case(&name) || s.short.as_deref().is_some_and(|short| short.eq_ignore_ascii_case(&name))
        })
    }

    pub fn get(&self, kind: CommandKind) -> Option<&CommandConfig> {
        self.specs.iter().find(|s| s.kind == kind)
    }

    /// Display name for pages about `kind`.
    pub fn title(&self, kind: CommandKind) -> String {
        self.get(kind).map_or_else(|| kind.to_string(), |s| s.long.clone())
    }

    pub fn workers(&self, kind: CommandKind) -> usize {
        self.get(kind).map_or(1, |s| s.workers.max(1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandConfig> {
        self.specs.iter()
    }
}

#[allow(clippy::too_many_arguments)]
fn spec(
    kind: CommandKind,
    long: &str,
    short: Option<&str>,
    args: (usize, Option<usize>),
    usage: &str,
    description: &str,
    examples: &[&str],
    category: &str,
) -> CommandConfig {
    CommandConfig {
        kind,
        long: long.to_string(),
        short: short.map(str::to_string),
        description: description.to_string(),
        min_args: args.0,
        max_args: args.1,
        usage: usage.to_string(),
        examples: examples.iter().map(|e| e.to_string()).collect(),
        enabled: true,
        workers: 4,
        category: category.to_string(),
    }
}

pub fn default_commands() -> Vec<CommandConfig> {
    vec![
        spec(
            CommandKind::Ban,
            "ban",
            Some("b"),
            (1, Some(2)),
            "ban <player> [server_id]",
            "Ban a player on every server, or on one",
            &["ban griefer", "ban griefer 123456"],
            "Players",
        ),
        spec(
            CommandKind::Unban,
            "unban",
            Some("ub"),
            (1, Some(2)),
            "unban <player> [server_id]",
            "Lift a player's ban on every server, or on one",
            &["unban griefer"],
            "Players",
        ),
        spec(
            CommandKind::Whitelist,
            "whitelist",
            Some("wl"),
            (1, Some(2)),
            "whitelist <player> [server_id]",
            "Add a player to the whitelist",
            &["whitelist friend"],
            "Players",
        ),
        spec(
            CommandKind::Unwhitelist,
            "unwhitelist",
            Some("uwl"),
            (1, Some(2)),
            "unwhitelist <player> [server_id]",
            "Remove a player from the whitelist",
            &["unwhitelist friend"],
            "Players",
        ),
        spec(
            CommandKind::ClearWhitelist,
            "clearwhitelist",
            Some("cwl"),
            (0, Some(1)),
            "clearwhitelist [server_id]",
            "Empty the whitelist",
            &["clearwhitelist", "clearwhitelist 123456"],
            "Players",
        ),
        spec(
            CommandKind::Stop,
            "stop",
            None,
            (0, Some(1)),
            "stop [server_id]",
            "Stop every server, or one",
            &["stop 123456"],
            "Servers",
        ),
        spec(
            CommandKind::Restart,
            "restart",
            None,
            (0, None),
            "restart [server_id] [message]",
            "Restart every server, or one, with an optional message",
            &["restart", "restart 123456 back in five"],
            "Servers",
        ),
        spec(
            CommandKind::Banlist,
            "banlist",
            Some("bl"),
            (0, Some(1)),
            "banlist [server_id]",
            "Show each server's banned players",
            &["banlist"],
            "Players",
        ),
        spec(
            CommandKind::GetWhitelist,
            "getwhitelist",
            Some("gwl"),
            (0, Some(1)),
            "getwhitelist [server_id]",
            "Show each server's whitelist",
            &["getwhitelist"],
            "Players",
        ),
        spec(
            CommandKind::SearchPlayers,
            "searchplayers",
            Some("sp"),
            (1, None),
            "searchplayers <name>",
            "Find player accounts by partial name on every server",
            &["searchplayers surv", "searchplayers John Smith"],
            "Players",
        ),
        spec(
            CommandKind::RefreshBans,
            "refreshbans",
            Some("rb"),
            (0, None),
            "refreshbans [server_id...]",
            "Copy every ban to the servers missing it",
            &["refreshbans", "refreshbans 123456 654321"],
            "Players",
        ),
        spec(
            CommandKind::Servers,
            "servers",
            Some("s"),
            (0, Some(0)),
            "servers",
            "List the enabled servers",
            &["servers"],
            "Servers",
        ),
        spec(
            CommandKind::Help,
            "help",
            Some("h"),
            (0, Some(1)),
            "help [command]",
            "Show command usage",
            &["help", "help ban"],
            "General",
        ),
    ]
}

/// Split a prefixed message into a lowercased command name and its arguments.
pub fn parse_invocation(prefix: &str, content: &str) -> Option<(String, Vec<String>)> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?.to_lowercase();
    Some((name, words.map(str::to_string).collect()))
}

pub fn check_args(spec: &CommandConfig, args: &[String]) -> Result<(), CommandError> {
    let too_few = args.len() < spec.min_args;
    let too_many = spec.max_args.is_some_and(|max| args.len() > max);
    if too_few || too_many {
        return Err(CommandError::Validation(format!(
            "Invalid number of arguments. Usage: {}",
            spec.usage
        )));
    }
    Ok(())
}

/// Parse an optional server id argument.
pub(crate) fn parse_server_id(arg: Option<&String>) -> Result<Option<i64>, CommandError> {
    match arg {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| CommandError::Validation(format!("Invalid server ID: {}", raw))),
    }
}

impl FleetBot {
    /// Handle one inbound message. Non-commands are ignored.
    pub async fn on_command(&self, msg: &CommandMessage) {
        let (name, args) = match parse_invocation(&self.settings.prefix, &msg.content) {
            Some(parsed) => parsed,
            None => return,
        };
        let spec = match self.commands.find(&name) {
            Some(spec) => spec,
            None => {
                debug!(command = %name, "Unknown command");
                return;
            }
        };

        info!(
            command = %spec.kind,
            user_id = msg.author.user_id,
            guild_id = ?msg.guild_id,
            "Command received"
        );

        match self.run_command(spec, msg, &args).await {
            Ok(Reply::Pages(pages)) => {
                if let Err(e) = send_pages(self.chat.as_ref(), msg.channel_id, &pages).await {
                    error!(command = %spec.kind, "Failed to send result pages: {}", e);
                }
            }
            Ok(Reply::Confirm { pages, action }) => {
                if let Err(e) = self.arm_confirmation(spec, msg, pages, action).await {
                    self.report_error(&spec.long, msg.channel_id, &e).await;
                }
            }
            Err(e) => self.report_error(&spec.long, msg.channel_id, &e).await,
        }
    }

    async fn run_command(
        &self,
        spec: &CommandConfig,
        msg: &CommandMessage,
        args: &[String],
    ) -> Result<Reply, CommandError> {
        if !spec.enabled {
            return Err(CommandError::Disabled);
        }
        check_args(spec, args)?;
        if spec.kind == CommandKind::Help {
            return help::run(self, args, &msg.author.name);
        }

        let guild_id = msg.guild_id.ok_or(CommandError::GuildOnly)?;
        let feed = load_feed(self.guilds.as_ref(), guild_id, &self.settings.guild_service).await?;
        self.authorize(&feed, spec, guild_id, &msg.roles).await?;

        let inv = Invocation {
            spec,
            msg,
            args,
            feed,
        };
        match spec.kind {
            CommandKind::Ban | CommandKind::Unban | CommandKind::Whitelist | CommandKind::Unwhitelist => {
                players::prompt(self, &inv)
            }
            CommandKind::ClearWhitelist | CommandKind::Stop | CommandKind::Restart => servers::prompt(self, &inv),
            CommandKind::Servers => servers::list(self, &inv),
            CommandKind::Banlist | CommandKind::GetWhitelist => lists::run(self, &inv).await,
            CommandKind::SearchPlayers => search::run(self, &inv).await,
            CommandKind::RefreshBans => refresh::prompt(self, &inv).await,
            CommandKind::Help => help::run(self, args, inv.requester()),
        }
    }

    /// A granted role, or failing that an Administrator role.
    async fn authorize(
        &self,
        feed: &GuildFeed,
        spec: &CommandConfig,
        guild_id: u64,
        roles: &[u64],
    ) -> Result<(), CommandError> {
        if feed.is_approved(spec.kind.as_str(), roles) {
            return Ok(());
        }
        if self.chat.is_admin(guild_id, roles).await? {
            return Ok(());
        }
        Err(CommandError::Unauthorized)
    }

    /// Send the prompt, persist the action, then add the confirmation reaction.
    ///
    /// When the action cannot be persisted the prompt is edited into an error
    /// so it never looks actionable.
    async fn arm_confirmation(
        &self,
        spec: &CommandConfig,
        msg: &CommandMessage,
        pages: Vec<Page>,
        action: PendingAction,
    ) -> Result<(), CommandError> {
        let conf = self.settings.confirmation(spec.kind);
        let ids = send_pages(self.chat.as_ref(), msg.channel_id, &pages).await?;
        let message_id = match ids.last() {
            Some(id) => *id,
            None => {
                return Err(CommandError::Chat {
                    message: "no prompt was sent".to_string(),
                    status: None,
                })
            }
        };

        let confirmation = Confirmation {
            message_id,
            key: PendingStore::cache_key(&conf.base, message_id),
            action,
            allowed_reactions: HashSet::from([emoji_key(&parse_reaction(&conf.reaction))]),
            user_id: msg.author.user_id,
            ttl: conf.ttl(),
        };
        if let Err(e) = self.pending.confirm(confirmation).await {
            let err = CommandError::Cache(e);
            error!(command = %spec.kind, message_id, "Failed to store pending action: {}", err);
            let page = views::error_page(&spec.long, &err, self.settings.documentation_url.clone());
            if let Err(edit_err) = self.chat.edit_page(msg.channel_id, message_id, &page).await {
                warn!(message_id, "Failed to mark prompt as failed: {}", edit_err);
                self.report_error(&spec.long, msg.channel_id, &err).await;
            }
            return Ok(());
        }

        self.chat
            .add_reaction(msg.channel_id, message_id, &conf.reaction)
            .await?;
        info!(command = %spec.kind, message_id, "Awaiting confirmation");
        Ok(())
    }
}

/// Prompt text shared by every confirmation.
pub(crate) fn confirm_hint(reaction: &str, ttl_secs: u64) -> String {
    format!(
        "React with {} within {} to confirm.",
        reaction,
        humanize_secs(ttl_secs)
    )
}

fn humanize_secs(secs: u64) -> String {
    match secs {
        s if s >= 60 && s % 60 == 0 => format!("{} minute(s)", s / 60),
        s => format!("{} second(s)", s),
    }
}
