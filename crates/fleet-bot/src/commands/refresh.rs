//! refreshbans: copy every known ban onto the servers missing it.

use std::collections::{BTreeMap, HashSet};

use fleet_types::{GameServer, PendingAction};

use super::{confirm_hint, Invocation, Reply};
use crate::aggregate::aggregate;
use crate::bot::FleetBot;
use crate::dispatch::dispatch;
use crate::errors::CommandError;
use crate::paginate::{paginate, Fragment};
use crate::views::failure_fragments;

/// Bans each sync server lacks, keyed by server id.
///
/// The union of every fetched list, in first-seen order, is compared against
/// each sync server's own list. Sync servers whose list was not fetched are
/// skipped, as are servers with nothing missing.
pub fn plan_refresh(fetched: &[(GameServer, Vec<String>)], sync: &[GameServer]) -> BTreeMap<u64, Vec<String>> {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = fetched
        .iter()
        .flat_map(|(_, bans)| bans.iter())
        .filter(|ban| seen.insert(ban.as_str()))
        .map(String::as_str)
        .collect();

    let mut plan = BTreeMap::new();
    for server in sync {
        let existing: HashSet<&str> = match fetched.iter().find(|(s, _)| s.id == server.id) {
            Some((_, bans)) => bans.iter().map(String::as_str).collect(),
            None => continue,
        };
        let missing: Vec<String> = unique
            .iter()
            .filter(|ban| !existing.contains(*ban))
            .map(|ban| ban.to_string())
            .collect();
        if !missing.is_empty() {
            plan.insert(server.id, missing);
        }
    }
    plan
}

pub(super) async fn prompt(bot: &FleetBot, inv: &Invocation<'_>) -> Result<Reply, CommandError> {
    let mut requested = Vec::with_capacity(inv.args.len());
    for raw in inv.args {
        let id = raw
            .parse::<i64>()
            .map_err(|_| CommandError::Validation(format!("Invalid server ID: {}", raw)))?;
        requested.push(id);
    }

    let enabled = inv.feed.select_targets(None);
    if enabled.is_empty() {
        return Err(CommandError::NotFound("Unable to find servers to get banlist".to_string()));
    }
    let sync: Vec<GameServer> = if requested.is_empty() {
        enabled.clone()
    } else {
        enabled
            .iter()
            .filter(|s| requested.contains(&s.remote_id))
            .cloned()
            .collect()
    };
    if sync.is_empty() {
        return Err(CommandError::NotFound("Invalid server(s) to refresh".to_string()));
    }

    let game = bot.game.clone();
    let dispatched = dispatch(enabled.clone(), inv.spec.workers, move |server: GameServer| {
        let game = game.clone();
        async move {
            game.banlist(&server)
                .await
                .map(|bans| bans.into_iter().map(|b| b.name).collect::<Vec<_>>())
        }
    });
    let result = aggregate(dispatched, bot.settings.deadlines.read()).await;
    if result.successes.is_empty() {
        return Err(CommandError::Remote("Failed to get banlists".to_string()));
    }

    let mut fetched: Vec<(GameServer, Vec<String>)> = result
        .successes
        .iter()
        .map(|s| (s.target.clone(), s.data.clone()))
        .collect();
    fetched.sort_by_key(|(server, _)| enabled.iter().position(|e| e.id == server.id));

    let server_bans = plan_refresh(&fetched, &sync);
    if server_bans.is_empty() {
        return Err(CommandError::NothingToDo("Your bans are already in sync".to_string()));
    }

    let servers: Vec<GameServer> = sync
        .into_iter()
        .filter(|s| server_bans.contains_key(&s.id))
        .collect();
    let total: usize = server_bans.values().map(Vec::len).sum();

    let conf = bot.settings.confirmation(inv.spec.kind);
    let description = format!(
        "{} ban(s) are missing across {} server(s). Add them?\n{}",
        total,
        servers.len(),
        confirm_hint(&conf.reaction, conf.ttl_secs)
    );
    let header = bot.header(&inv.spec.long, description, Some(inv.requester()));

    let mut fragments: Vec<Fragment> = servers
        .iter()
        .map(|s| {
            let bans = server_bans.get(&s.id).map(Vec::as_slice).unwrap_or_default();
            Fragment::new(s.label(), format!("{} ban(s) to add\n{}", bans.len(), bans.join("\n")))
        })
        .collect();
    fragments.extend(failure_fragments(&result, GameServer::label));
    let pages = paginate(&header, fragments, &bot.settings.limits);

    Ok(Reply::Confirm {
        pages,
        action: PendingAction::RefreshBans { servers, server_bans },
    })
}
