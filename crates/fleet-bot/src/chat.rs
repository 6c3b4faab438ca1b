//! Chat surface: where pages are sent and reactions attached.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage};
use serenity::http::Http;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, EmojiId, GuildId, MessageId, RoleId};
use tracing::debug;

use crate::config::Colours;
use crate::errors::{chat_error, CommandError};
use crate::paginate::{Page, Tone};

#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Returns the id of the created message.
    async fn send_page(&self, channel_id: u64, page: &Page) -> Result<u64, CommandError>;
    async fn edit_page(&self, channel_id: u64, message_id: u64, page: &Page) -> Result<(), CommandError>;
    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), CommandError>;
    /// True when one of `roles` carries the Administrator permission.
    async fn is_admin(&self, guild_id: u64, roles: &[u64]) -> Result<bool, CommandError>;
}

/// Send pages in order, stopping at the first failure.
pub async fn send_pages(chat: &dyn ChatSurface, channel_id: u64, pages: &[Page]) -> Result<Vec<u64>, CommandError> {
    let mut ids = Vec::with_capacity(pages.len());
    for page in pages {
        ids.push(chat.send_page(channel_id, page).await?);
    }
    Ok(ids)
}

/// Parse a configured reaction: a unicode emoji or a custom `<:name:id>`.
pub fn parse_reaction(raw: &str) -> ReactionType {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        let animated = inner.starts_with("a:");
        let mut parts = inner.trim_start_matches("a:").trim_start_matches(':').rsplitn(2, ':');
        let id = parts.next().and_then(|id| id.parse::<u64>().ok()).filter(|id| *id != 0);
        let name = parts.next().map(|n| n.to_string());
        if let Some(id) = id {
            return ReactionType::Custom {
                animated,
                id: EmojiId::new(id),
                name,
            };
        }
    }
    ReactionType::Unicode(trimmed.to_string())
}

/// Identity used to compare reactions: the emoji itself, or a custom emoji's id.
pub fn emoji_key(reaction: &ReactionType) -> String {
    match reaction {
        ReactionType::Custom { id, .. } => id.get().to_string(),
        ReactionType::Unicode(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Wrap a body in a code block; Discord rejects empty field values.
fn code_block(body: &str) -> String {
    if body.is_empty() {
        "```\n-\n```".to_string()
    } else {
        format!("```\n{}\n```", body)
    }
}

pub(crate) fn build_embed(page: &Page, colours: &Colours) -> CreateEmbed {
    let colour = match page.header.tone {
        Tone::Ok => colours.ok,
        Tone::Warn => colours.warn,
        Tone::Error => colours.error,
    };
    let mut embed = CreateEmbed::new()
        .title(&page.header.title)
        .description(&page.header.description)
        .colour(colour);
    if let Some(url) = &page.header.url {
        embed = embed.url(url);
    }
    if let Some(footer) = &page.header.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    embed.fields(page.fragments.iter().map(|f| {
        let name = if f.title.is_empty() { "\u{200b}".to_string() } else { f.title.clone() };
        (name, code_block(&f.body), false)
    }))
}

/// [`ChatSurface`] over serenity's HTTP client
#[derive(Clone)]
pub struct SerenityChat {
    http: Arc<Http>,
    colours: Colours,
}

impl SerenityChat {
    pub fn new(http: Arc<Http>, colours: Colours) -> Self {
        Self { http, colours }
    }
}

#[async_trait]
impl ChatSurface for SerenityChat {
    async fn send_page(&self, channel_id: u64, page: &Page) -> Result<u64, CommandError> {
        let message = CreateMessage::new().embed(build_embed(page, &self.colours));
        let sent = ChannelId::new(channel_id)
            .send_message(self.http.as_ref(), message)
            .await
            .map_err(|e| chat_error("Failed to send page", e))?;
        debug!(channel_id, message_id = sent.id.get(), "Sent page");
        Ok(sent.id.get())
    }

    async fn edit_page(&self, channel_id: u64, message_id: u64, page: &Page) -> Result<(), CommandError> {
        let edit = EditMessage::new().embed(build_embed(page, &self.colours));
        ChannelId::new(channel_id)
            .edit_message(self.http.as_ref(), MessageId::new(message_id), edit)
            .await
            .map_err(|e| chat_error("Failed to edit page", e))?;
        Ok(())
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), CommandError> {
        ChannelId::new(channel_id)
            .create_reaction(self.http.as_ref(), MessageId::new(message_id), parse_reaction(emoji))
            .await
            .map_err(|e| chat_error("Failed to add reaction", e))
    }

    async fn is_admin(&self, guild_id: u64, roles: &[u64]) -> Result<bool, CommandError> {
        let guild_roles = GuildId::new(guild_id)
            .roles(self.http.as_ref())
            .await
            .map_err(|e| chat_error("Failed to fetch guild roles", e))?;
        Ok(roles.iter().filter(|id| **id != 0).any(|id| {
            guild_roles
                .get(&RoleId::new(*id))
                .is_some_and(|role| role.permissions.administrator())
        }))
    }
}
