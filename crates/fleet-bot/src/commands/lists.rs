//! banlist and getwhitelist: read-only fan-outs with a fixed deadline.

use fleet_types::{CommandKind, GameServer};

use super::{parse_server_id, Invocation, Reply};
use crate::aggregate::aggregate;
use crate::bot::FleetBot;
use crate::dispatch::dispatch;
use crate::errors::CommandError;
use crate::paginate::Renderable;
use crate::views::{outcome_pages, PlayerList};

pub(super) async fn run(bot: &FleetBot, inv: &Invocation<'_>) -> Result<Reply, CommandError> {
    let kind = inv.spec.kind;
    let remote_id = parse_server_id(inv.args.first())?;
    let servers = inv.feed.select_targets(remote_id);
    if servers.is_empty() {
        return Err(CommandError::NotFound(match kind {
            CommandKind::GetWhitelist => "Unable to find servers to get whitelist".to_string(),
            _ => "Unable to find servers to get banlist".to_string(),
        }));
    }

    let game = bot.game.clone();
    let order = servers.clone();
    let dispatched = match kind {
        CommandKind::GetWhitelist => dispatch(servers, inv.spec.workers, move |server: GameServer| {
            let game = game.clone();
            async move { game.whitelist(&server).await }
        }),
        _ => dispatch(servers, inv.spec.workers, move |server: GameServer| {
            let game = game.clone();
            async move {
                game.banlist(&server)
                    .await
                    .map(|bans| bans.into_iter().map(|b| b.name).collect::<Vec<_>>())
            }
        }),
    };
    let mut result = aggregate(dispatched, bot.settings.deadlines.read()).await;
    result
        .successes
        .sort_by_key(|s| order.iter().position(|o| o.id == s.target.id));

    let (description, empty_text) = match kind {
        CommandKind::GetWhitelist => ("Whitelisted players per server", "No Players Whitelisted"),
        _ => ("Banned players per server", "No Players Banned"),
    };
    let successes = result
        .successes
        .iter()
        .map(|s| {
            PlayerList {
                server: &s.target,
                players: &s.data,
                empty_text,
            }
            .render()
        })
        .collect();

    let header = bot.header(&inv.spec.long, description, Some(inv.requester()));
    let pages = outcome_pages(header, &result, successes, GameServer::label, &bot.settings.limits);
    Ok(Reply::Pages(pages))
}
