//! Fleet admin bot
//!
//! Runs moderation and maintenance commands from Discord against every game
//! server a guild has registered, asking for a confirmation reaction before
//! anything that changes remote state.

mod actions;
mod aggregate;
mod bot;
mod chat;
mod clock;
mod commands;
mod config;
mod dispatch;
mod errors;
mod gateway;
mod guilds;
mod handlers;
mod health;
#[cfg(test)]
mod mocks;
mod paginate;
mod pending;
mod reactions;
mod views;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use fleet_kv::{connect, open_bucket, NatsKvCache};
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::FleetBot;
use crate::chat::SerenityChat;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::gateway::HttpGameGateway;
use crate::guilds::HttpGuildDirectory;
use crate::handlers::Handler;
use crate::health::AppState;
use crate::pending::{spawn_reaper, PendingRegistry, PendingStore};

/// Fleet admin bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/fleet-bot.toml")]
    config: String,

    /// NATS URL (overrides config file)
    #[arg(long, env = "NATS_URL")]
    nats_url: Option<String>,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    bot_token: Option<String>,

    /// Command prefix (overrides config file)
    #[arg(long, env = "COMMAND_PREFIX")]
    prefix: Option<String>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3001")]
    health_port: u16,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(nats_url) = &self.nats_url {
            config.kv.servers = nats_url
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(bot_token) = &self.bot_token {
            config.discord.bot_token = bot_token.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.discord.prefix = prefix.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_bot=debug,fleet_kv=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fleet bot");

    let args = Args::parse();

    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env()?
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    if config.discord.bot_token.is_empty() {
        anyhow::bail!("Discord bot token is not configured");
    }
    if config.services.game_api_token.is_empty() {
        warn!("Game API token is empty; remote calls will be unauthenticated");
    }

    // Durable store for pending actions
    let nats_client = connect(&config.kv).await?;
    let js = async_nats::jetstream::new(nats_client);
    let store = open_bucket(&js, &config.kv).await?;
    info!(bucket = %config.kv.bucket, "Pending-action bucket ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pending = PendingStore::new(
        Arc::new(NatsKvCache::new(store)),
        Arc::new(PendingRegistry::new()),
        clock.clone(),
    );
    let registry = pending.registry().clone();

    let timeout = config.services.request_timeout();
    let game = HttpGameGateway::new(
        config.services.game_api_url.clone(),
        config.services.game_api_token.clone(),
        timeout,
    )
    .context("Failed to build game API client")?;
    let guilds = HttpGuildDirectory::new(
        config.services.guild_config_url.clone(),
        config.services.guild_config_token.clone(),
        timeout,
    )
    .context("Failed to build guild config client")?;

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let chat = SerenityChat::new(client.http.clone(), config.discord.colours);
    let bot = Arc::new(FleetBot::new(
        Arc::new(game),
        Arc::new(guilds),
        Arc::new(chat),
        pending,
        &config,
    ));
    let health_state = AppState::new(registry.clone());

    {
        let mut data = client.data.write().await;
        data.insert::<FleetBot>(bot);
        data.insert::<AppState>(health_state.clone());
    }

    let reaper = spawn_reaper(registry, clock, config.reaper.interval());

    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!("Health server error: {}", e);
        }
    });

    // Graceful shutdown: close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Discord client error: {}", e))?;

    reaper.abort();
    info!("Fleet bot stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
