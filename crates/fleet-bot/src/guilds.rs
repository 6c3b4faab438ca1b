//! Guild-configuration service: servers and command permissions per guild.

use std::time::Duration;

use async_trait::async_trait;
use fleet_types::GuildFeed;
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::errors::CommandError;

#[async_trait]
pub trait GuildDirectory: Send + Sync {
    async fn guild_feed(&self, guild_id: u64) -> Result<GuildFeed, CommandError>;
}

/// Fetch a feed and check the guild subscribed to `service`.
pub async fn load_feed(
    directory: &dyn GuildDirectory,
    guild_id: u64,
    service: &str,
) -> Result<GuildFeed, CommandError> {
    let feed = directory.guild_feed(guild_id).await?;
    feed.validate_service(service)
        .map_err(|msg| CommandError::Guild(msg.to_string()))?;
    Ok(feed)
}

#[derive(Clone)]
pub struct HttpGuildDirectory {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpGuildDirectory {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl GuildDirectory for HttpGuildDirectory {
    async fn guild_feed(&self, guild_id: u64) -> Result<GuildFeed, CommandError> {
        let url = format!("{}/guilds/{}/feed", self.base_url, guild_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                warn!(guild_id, "Guild config request failed: {}", e);
                CommandError::Guild("Failed to get guild feed".to_string())
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CommandError::Guild("Discord server not set up".to_string())),
            status if !status.is_success() => {
                warn!(guild_id, %status, "Guild config service returned an error");
                Err(CommandError::Guild("Failed to get guild feed".to_string()))
            }
            _ => response.json::<GuildFeed>().await.map_err(|e| {
                warn!(guild_id, "Unreadable guild feed: {}", e);
                CommandError::Guild("Failed to retrieve bot information".to_string())
            }),
        }
    }
}
