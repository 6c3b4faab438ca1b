//! Server-wide actions (stop, restart, clearwhitelist) and the server listing.

use fleet_types::{CommandKind, PendingAction};

use super::{confirm_hint, parse_server_id, Invocation, Reply};
use crate::bot::FleetBot;
use crate::errors::CommandError;
use crate::paginate::{paginate, paginate_all, Fragment};
use crate::views::{ServerEntry, ServersDone};

/// Splits restart arguments into an optional leading server id and a message.
fn restart_args(args: &[String]) -> (Option<i64>, Option<String>) {
    let (remote_id, rest) = match args.first().and_then(|a| a.parse::<i64>().ok()) {
        Some(id) => (Some(id), &args[1..]),
        None => (None, args),
    };
    let message = if rest.is_empty() { None } else { Some(rest.join(" ")) };
    (remote_id, message)
}

pub(super) fn prompt(bot: &FleetBot, inv: &Invocation<'_>) -> Result<Reply, CommandError> {
    let kind = inv.spec.kind;
    let (remote_id, message) = match kind {
        CommandKind::Restart => restart_args(inv.args),
        _ => (parse_server_id(inv.args.first())?, None),
    };

    let servers = inv.feed.select_targets(remote_id);
    let what = match kind {
        CommandKind::Stop => "stop",
        CommandKind::Restart => "restart",
        _ => "clear the whitelist on",
    };
    if servers.is_empty() {
        let target = match kind {
            CommandKind::Stop => "stop",
            CommandKind::Restart => "restart",
            _ => "clear whitelist on",
        };
        return Err(CommandError::NotFound(format!("Unable to find servers to {}", target)));
    }

    let conf = bot.settings.confirmation(kind);
    let mut description = format!(
        "Are you sure you want to {} {} server(s)?",
        what,
        servers.len()
    );
    if let Some(message) = &message {
        description.push_str(&format!("\nMessage: {}", message));
    }
    description.push('\n');
    description.push_str(&confirm_hint(&conf.reaction, conf.ttl_secs));

    let header = bot.header(&inv.spec.long, description, Some(inv.requester()));
    let fragments = ServersDone {
        title: "Servers".to_string(),
        servers: &servers,
    }
    .fragments(&bot.settings.limits);
    let pages = paginate(&header, fragments, &bot.settings.limits);

    let action = match kind {
        CommandKind::Stop => PendingAction::StopServers { servers },
        CommandKind::Restart => PendingAction::RestartServers { servers, message },
        _ => PendingAction::ClearWhitelist { servers },
    };
    Ok(Reply::Confirm { pages, action })
}

pub(super) fn list(bot: &FleetBot, inv: &Invocation<'_>) -> Result<Reply, CommandError> {
    let servers = inv.feed.select_targets(None);
    let header = bot.header(
        &inv.spec.long,
        format!("{} enabled server(s)", servers.len()),
        Some(inv.requester()),
    );
    if servers.is_empty() {
        let pages = paginate(
            &header,
            vec![Fragment::new("No servers", "No enabled servers are set up for this Discord server")],
            &bot.settings.limits,
        );
        return Ok(Reply::Pages(pages));
    }
    let entries: Vec<ServerEntry<'_>> = servers.iter().map(ServerEntry).collect();
    Ok(Reply::Pages(paginate_all(&header, &entries, &bot.settings.limits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_restart_args() {
        assert_eq!(restart_args(&[]), (None, None));
        assert_eq!(restart_args(&args(&["123"])), (Some(123), None));
        assert_eq!(
            restart_args(&args(&["123", "back", "soon"])),
            (Some(123), Some("back soon".to_string()))
        );
        assert_eq!(
            restart_args(&args(&["patch", "day"])),
            (None, Some("patch day".to_string()))
        );
    }
}
