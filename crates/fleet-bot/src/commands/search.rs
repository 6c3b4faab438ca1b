//! searchplayers: find accounts by partial name on every enabled server.

use std::collections::BTreeMap;

use fleet_types::{GameServer, PlayerAccount};

use super::{Invocation, Reply};
use crate::aggregate::aggregate;
use crate::bot::FleetBot;
use crate::dispatch::{dispatch, Success};
use crate::errors::CommandError;
use crate::paginate::{Fragment, Renderable};
use crate::views::outcome_pages;

pub const MIN_SEARCH_CHARS: usize = 3;

/// One account name and every server it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMatch {
    pub name: String,
    pub online: bool,
    pub last_online: Option<String>,
    pub servers: Vec<GameServer>,
}

impl Renderable for AccountMatch {
    fn render(&self) -> Fragment {
        let mut lines = Vec::new();
        if !self.online {
            if let Some(last) = &self.last_online {
                lines.push(format!("Last online: {}", last));
            }
        }
        lines.push("Server(s):".to_string());
        lines.extend(self.servers.iter().map(GameServer::label));

        let marker = if self.online { "🟢" } else { "🔴" };
        Fragment::new(format!("{} {}", marker, self.name), lines.join("\n"))
    }
}

/// Merge per-server results by account name, sorted by name.
///
/// An account online anywhere counts as online. Nameless entries are skipped.
pub fn group_matches(successes: &[Success<GameServer, Vec<PlayerAccount>>]) -> Vec<AccountMatch> {
    let mut by_name: BTreeMap<&str, AccountMatch> = BTreeMap::new();
    for ok in successes {
        for account in ok.data.iter().filter(|a| !a.name.trim().is_empty()) {
            let entry = by_name.entry(account.name.as_str()).or_insert_with(|| AccountMatch {
                name: account.name.clone(),
                online: false,
                last_online: None,
                servers: Vec::new(),
            });
            entry.online |= account.online;
            if entry.last_online.is_none() {
                entry.last_online = account.last_online.clone();
            }
            if !entry.servers.contains(&ok.target) {
                entry.servers.push(ok.target.clone());
            }
        }
    }
    by_name.into_values().collect()
}

pub(super) async fn run(bot: &FleetBot, inv: &Invocation<'_>) -> Result<Reply, CommandError> {
    let partial = inv.args.join(" ");
    if partial.chars().count() < MIN_SEARCH_CHARS {
        return Err(CommandError::Validation(format!(
            "Player name must be at least {} characters long",
            MIN_SEARCH_CHARS
        )));
    }

    let servers = inv.feed.select_targets(None);
    if servers.is_empty() {
        return Err(CommandError::NotFound(
            "Unable to find servers to search for player on".to_string(),
        ));
    }

    let game = bot.game.clone();
    let order = servers.clone();
    let needle = partial.clone();
    let dispatched = dispatch(servers, inv.spec.workers, move |server: GameServer| {
        let game = game.clone();
        let needle = needle.clone();
        async move { game.search_players(&server, &needle).await }
    });
    let mut result = aggregate(dispatched, bot.settings.deadlines.read()).await;
    result
        .successes
        .sort_by_key(|s| order.iter().position(|o| o.id == s.target.id));

    let matches = group_matches(&result.successes);
    let header = bot.header(
        &inv.spec.long,
        format!(
            "Found {} player(s) matching \"{}\" across {} server(s)",
            matches.len(),
            partial,
            result.successes.len()
        ),
        Some(inv.requester()),
    );
    let successes = matches.iter().map(Renderable::render).collect();
    let pages = outcome_pages(header, &result, successes, GameServer::label, &bot.settings.limits);
    Ok(Reply::Pages(pages))
}
