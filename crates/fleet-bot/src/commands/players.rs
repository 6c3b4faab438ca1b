//! ban, unban, whitelist and unwhitelist: one player on one or all servers.

use fleet_types::{CommandKind, PendingAction};

use super::{confirm_hint, parse_server_id, Invocation, Reply};
use crate::bot::FleetBot;
use crate::errors::CommandError;
use crate::paginate::paginate;
use crate::views::ServersDone;

fn verb(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Unban => "unban",
        CommandKind::Whitelist => "whitelist",
        CommandKind::Unwhitelist => "unwhitelist",
        _ => "ban",
    }
}

pub(super) fn prompt(bot: &FleetBot, inv: &Invocation<'_>) -> Result<Reply, CommandError> {
    let kind = inv.spec.kind;
    let player = inv
        .args
        .first()
        .cloned()
        .ok_or_else(|| CommandError::Validation(format!("Usage: {}", inv.spec.usage)))?;
    let remote_id = parse_server_id(inv.args.get(1))?;

    let servers = inv.feed.select_targets(remote_id);
    if servers.is_empty() {
        return Err(CommandError::NotFound(format!(
            "Unable to find servers to {} on",
            verb(kind)
        )));
    }

    let conf = bot.settings.confirmation(kind);
    let description = format!(
        "Are you sure you want to {} **{}** on {} server(s)?\n{}",
        verb(kind),
        player,
        servers.len(),
        confirm_hint(&conf.reaction, conf.ttl_secs)
    );
    let header = bot.header(&inv.spec.long, description, Some(inv.requester()));
    let fragments = ServersDone {
        title: "Servers".to_string(),
        servers: &servers,
    }
    .fragments(&bot.settings.limits);
    let pages = paginate(&header, fragments, &bot.settings.limits);

    let action = match kind {
        CommandKind::Unban => PendingAction::UnbanPlayer { player, servers },
        CommandKind::Whitelist => PendingAction::WhitelistPlayer { player, servers },
        CommandKind::Unwhitelist => PendingAction::UnwhitelistPlayer { player, servers },
        _ => PendingAction::BanPlayer { player, servers },
    };
    Ok(Reply::Confirm { pages, action })
}
