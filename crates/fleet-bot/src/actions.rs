//! Confirmed actions: the write fan-outs run once a reaction is accepted.

use std::sync::Arc;

use fleet_types::{GameServer, PendingAction, RemoteFailure};
use tracing::info;

use crate::aggregate::aggregate;
use crate::bot::FleetBot;
use crate::dispatch::dispatch;
use crate::errors::CommandError;
use crate::gateway::{GameGateway, PLAYER_LOOKUP_FAILED};
use crate::guilds::load_feed;
use crate::paginate::{Fragment, Page};
use crate::views::{chunk_lines, outcome_pages, ServersDone};

/// One remote call per server.
#[derive(Debug, Clone, PartialEq)]
enum ServerOp {
    Ban(String),
    Unban(String),
    Whitelist(String),
    Unwhitelist(String),
    ClearWhitelist,
    Stop,
    Restart(Option<String>),
}

impl ServerOp {
    fn from_action(action: PendingAction) -> Option<Self> {
        Some(match action {
            PendingAction::BanPlayer { player, .. } => ServerOp::Ban(player),
            PendingAction::UnbanPlayer { player, .. } => ServerOp::Unban(player),
            PendingAction::WhitelistPlayer { player, .. } => ServerOp::Whitelist(player),
            PendingAction::UnwhitelistPlayer { player, .. } => ServerOp::Unwhitelist(player),
            PendingAction::ClearWhitelist { .. } => ServerOp::ClearWhitelist,
            PendingAction::StopServers { .. } => ServerOp::Stop,
            PendingAction::RestartServers { message, .. } => ServerOp::Restart(message),
            PendingAction::RefreshBans { .. } => return None,
        })
    }

    fn done_title(&self) -> String {
        match self {
            ServerOp::Ban(p) => format!("Banned {}", p),
            ServerOp::Unban(p) => format!("Unbanned {}", p),
            ServerOp::Whitelist(p) => format!("Whitelisted {}", p),
            ServerOp::Unwhitelist(p) => format!("Removed {} from whitelist", p),
            ServerOp::ClearWhitelist => "Cleared whitelist".to_string(),
            ServerOp::Stop => "Stopped".to_string(),
            ServerOp::Restart(_) => "Restarted".to_string(),
        }
    }

    fn summary(&self) -> String {
        match self {
            ServerOp::Ban(p) => format!("Ban results for {}", p),
            ServerOp::Unban(p) => format!("Unban results for {}", p),
            ServerOp::Whitelist(p) => format!("Whitelist results for {}", p),
            ServerOp::Unwhitelist(p) => format!("Unwhitelist results for {}", p),
            ServerOp::ClearWhitelist => "Clear whitelist results".to_string(),
            ServerOp::Stop => "Stop results".to_string(),
            ServerOp::Restart(_) => "Restart results".to_string(),
        }
    }

    async fn apply(&self, game: &dyn GameGateway, server: &GameServer) -> Result<(), RemoteFailure> {
        match self {
            ServerOp::Ban(p) => game.ban_player(server, p).await.map_err(|f| explain(f, p)),
            ServerOp::Unban(p) => game.unban_player(server, p).await.map_err(|f| explain(f, p)),
            ServerOp::Whitelist(p) => game.whitelist_player(server, p).await.map_err(|f| explain(f, p)),
            ServerOp::Unwhitelist(p) => game.unwhitelist_player(server, p).await.map_err(|f| explain(f, p)),
            ServerOp::ClearWhitelist => game.clear_whitelist(server).await,
            ServerOp::Stop => game.stop_server(server).await,
            ServerOp::Restart(message) => game.restart_server(server, message.as_deref()).await,
        }
    }
}

/// Swap the game service's lookup failure for something readable.
fn explain(failure: RemoteFailure, player: &str) -> RemoteFailure {
    if failure.message == PLAYER_LOOKUP_FAILED {
        RemoteFailure {
            message: format!("Could not find player: {}", player),
            status: failure.status,
        }
    } else {
        failure
    }
}

/// Run a confirmed action against the servers that are still enabled.
pub(crate) async fn execute(
    bot: &FleetBot,
    guild_id: u64,
    action: PendingAction,
    requester: Option<&str>,
) -> Result<Vec<Page>, CommandError> {
    let kind = action.kind();
    let feed = load_feed(bot.guilds.as_ref(), guild_id, &bot.settings.guild_service).await?;
    let servers = feed.still_enabled(action.servers());
    if servers.is_empty() {
        return Err(CommandError::NotFound(
            "None of the selected servers are still enabled".to_string(),
        ));
    }

    let title = bot.commands.title(kind);
    let workers = bot.commands.workers(kind);
    info!(command = %kind, targets = servers.len(), "Executing confirmed action");

    match action {
        PendingAction::RefreshBans { server_bans, .. } => {
            let targets: Vec<(GameServer, String)> = servers
                .iter()
                .flat_map(|server| {
                    server_bans
                        .get(&server.id)
                        .into_iter()
                        .flatten()
                        .map(move |player| (server.clone(), player.clone()))
                })
                .collect();
            if targets.is_empty() {
                return Err(CommandError::NothingToDo("Your bans are already in sync".to_string()));
            }
            Ok(refresh_bans(bot, &title, servers, targets, workers, requester).await)
        }
        other => match ServerOp::from_action(other) {
            Some(op) => Ok(run_server_op(bot, &title, servers, op, workers, requester).await),
            None => Err(CommandError::Validation("Unsupported action".to_string())),
        },
    }
}

async fn run_server_op(
    bot: &FleetBot,
    title: &str,
    servers: Vec<GameServer>,
    op: ServerOp,
    workers: usize,
    requester: Option<&str>,
) -> Vec<Page> {
    let op = Arc::new(op);
    let game = bot.game.clone();
    let job_op = op.clone();
    let dispatched = dispatch(servers.clone(), workers, move |server: GameServer| {
        let game = game.clone();
        let op = job_op.clone();
        async move { op.apply(game.as_ref(), &server).await }
    });
    let result = aggregate(dispatched, bot.settings.deadlines.write()).await;
    info!(
        targets = servers.len(),
        succeeded = result.successes.len(),
        failed = result.failure_count(),
        missing = result.missing,
        "Confirmed action finished"
    );

    let done: Vec<GameServer> = servers
        .iter()
        .filter(|s| result.successes.iter().any(|ok| ok.target.id == s.id))
        .cloned()
        .collect();
    let successes = if done.is_empty() {
        Vec::new()
    } else {
        ServersDone {
            title: op.done_title(),
            servers: &done,
        }
        .fragments(&bot.settings.limits)
    };

    let header = bot.header(title, op.summary(), requester);
    outcome_pages(header, &result, successes, GameServer::label, &bot.settings.limits)
}

async fn refresh_bans(
    bot: &FleetBot,
    title: &str,
    servers: Vec<GameServer>,
    targets: Vec<(GameServer, String)>,
    workers: usize,
    requester: Option<&str>,
) -> Vec<Page> {
    let total = targets.len();
    let game = bot.game.clone();
    let dispatched = dispatch(targets, workers, move |(server, player): (GameServer, String)| {
        let game = game.clone();
        async move {
            game.ban_player(&server, &player)
                .await
                .map_err(|f| explain(f, &player))
        }
    });
    let result = aggregate(dispatched, bot.settings.deadlines.write()).await;
    info!(
        targets = total,
        succeeded = result.successes.len(),
        failed = result.failure_count(),
        missing = result.missing,
        "Ban refresh finished"
    );

    let mut successes: Vec<Fragment> = Vec::new();
    for server in &servers {
        let mut added: Vec<String> = result
            .successes
            .iter()
            .filter(|ok| ok.target.0.id == server.id)
            .map(|ok| ok.target.1.clone())
            .collect();
        if added.is_empty() {
            continue;
        }
        added.sort();
        successes.extend(chunk_lines(
            &server.label(),
            &added,
            bot.settings.limits.max_fragment_chars,
            false,
        ));
    }

    let header = bot.header(
        title,
        format!("Added {} of {} missing ban(s)", result.successes.len(), total),
        requester,
    );
    outcome_pages(
        header,
        &result,
        successes,
        |(server, player): &(GameServer, String)| format!("{}: {}", server.label(), player),
        &bot.settings.limits,
    )
}
