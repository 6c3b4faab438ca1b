//! Serenity event handler implementation

use std::sync::Arc;

use fleet_types::{CommandMessage, ReactionAdded, Requester};
use serenity::async_trait;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::bot::FleetBot;
use crate::chat::emoji_key;
use crate::health::AppState;

pub struct Handler;

async fn fleet_bot(ctx: &Context) -> Option<Arc<FleetBot>> {
    let data = ctx.data.read().await;
    let bot = data.get::<FleetBot>().cloned();
    if bot.is_none() {
        error!("FleetBot not found in context data");
    }
    bot
}

fn command_message(msg: &Message) -> CommandMessage {
    CommandMessage {
        guild_id: msg.guild_id.map(|id| id.get()),
        channel_id: msg.channel_id.get(),
        message_id: msg.id.get(),
        author: Requester {
            user_id: msg.author.id.get(),
            name: msg.author.global_name.clone().unwrap_or_else(|| msg.author.name.clone()),
        },
        roles: msg
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default(),
        content: msg.content.clone(),
    }
}

fn reaction_added(reaction: &Reaction, user_id: u64) -> ReactionAdded {
    ReactionAdded {
        guild_id: reaction.guild_id.map(|id| id.get()),
        channel_id: reaction.channel_id.get(),
        message_id: reaction.message_id.get(),
        user_id,
        user_name: reaction.member.as_ref().map(|m| m.display_name().to_string()),
        emoji: emoji_key(&reaction.emoji),
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Fleet bot connected as {}", ready.user.name);

        let data = ctx.data.read().await;
        if let Some(bot) = data.get::<FleetBot>() {
            bot.set_bot_user_id(ready.user.id.get());
        }
        if let Some(health) = data.get::<AppState>() {
            health.set_bot_username(ready.user.name.clone()).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Skip bot messages
        if msg.author.bot {
            return;
        }
        let bot = match fleet_bot(&ctx).await {
            Some(b) => b,
            None => return,
        };
        bot.on_command(&command_message(&msg)).await;
    }

    async fn reaction_add(&self, ctx: Context, add_reaction: Reaction) {
        let user_id = match add_reaction.user_id {
            Some(id) => id.get(),
            None => return,
        };
        let bot = match fleet_bot(&ctx).await {
            Some(b) => b,
            None => return,
        };
        if bot.is_self(user_id) {
            return;
        }

        let outcome = bot.on_reaction(&reaction_added(&add_reaction, user_id)).await;
        debug!(message_id = add_reaction.message_id.get(), ?outcome, "Reaction handled");
    }
}
