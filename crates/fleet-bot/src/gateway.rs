//! Game-action service: one remote call against one server.

use std::time::Duration;

use async_trait::async_trait;
use fleet_types::{BannedPlayer, GameServer, PlayerAccount, RemoteFailure};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Text the game service returns when a player name cannot be resolved.
pub const PLAYER_LOOKUP_FAILED: &str = "Can't lookup player name to ID.";

#[async_trait]
pub trait GameGateway: Send + Sync {
    async fn ban_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure>;
    async fn unban_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure>;
    async fn whitelist_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure>;
    async fn unwhitelist_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure>;
    async fn clear_whitelist(&self, server: &GameServer) -> Result<(), RemoteFailure>;
    async fn stop_server(&self, server: &GameServer) -> Result<(), RemoteFailure>;
    async fn restart_server(&self, server: &GameServer, message: Option<&str>) -> Result<(), RemoteFailure>;
    async fn banlist(&self, server: &GameServer) -> Result<Vec<BannedPlayer>, RemoteFailure>;
    async fn whitelist(&self, server: &GameServer) -> Result<Vec<String>, RemoteFailure>;
    /// Accounts whose name contains `partial_name`
    async fn search_players(&self, server: &GameServer, partial_name: &str) -> Result<Vec<PlayerAccount>, RemoteFailure>;
}

#[derive(Debug, Serialize)]
struct PlayerRequest<'a> {
    player: &'a str,
}

#[derive(Debug, Serialize)]
struct RestartRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PlayerList {
    #[serde(default)]
    players: Vec<BannedPlayer>,
}

#[derive(Debug, Deserialize)]
struct AccountList {
    #[serde(default)]
    players: Vec<PlayerAccount>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Build the failure for a non-2xx response, preferring the service's own message.
fn failure_from_body(status: u16, body: &str) -> RemoteFailure {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Game service returned HTTP {}", status));
    RemoteFailure::with_status(message, status)
}

/// HTTP client for the game-action service
#[derive(Clone)]
pub struct HttpGameGateway {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpGameGateway {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, server: &GameServer, path: &str) -> String {
        format!("{}/servers/{}/{}", self.base_url, server.remote_id, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteFailure> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                debug!("Game service request failed: {}", e);
                if e.is_timeout() {
                    RemoteFailure::new("Game service timed out")
                } else {
                    RemoteFailure::new("Failed to reach the game service")
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(failure_from_body(status.as_u16(), &body))
    }

    async fn players(&self, server: &GameServer, path: &str) -> Result<Vec<BannedPlayer>, RemoteFailure> {
        let response = self.send(self.client.get(self.url(server, path))).await?;
        let list: PlayerList = response
            .json()
            .await
            .map_err(|_| RemoteFailure::new("Unreadable response from the game service"))?;
        Ok(list.players)
    }
}

#[async_trait]
impl GameGateway for HttpGameGateway {
    async fn ban_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        let req = self.client.post(self.url(server, "bans")).json(&PlayerRequest { player });
        self.send(req).await.map(|_| ())
    }

    async fn unban_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        let req = self.client.delete(self.url(server, "bans")).json(&PlayerRequest { player });
        self.send(req).await.map(|_| ())
    }

    async fn whitelist_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        let req = self.client.post(self.url(server, "whitelist")).json(&PlayerRequest { player });
        self.send(req).await.map(|_| ())
    }

    async fn unwhitelist_player(&self, server: &GameServer, player: &str) -> Result<(), RemoteFailure> {
        let req = self.client.delete(self.url(server, "whitelist")).json(&PlayerRequest { player });
        self.send(req).await.map(|_| ())
    }

    async fn clear_whitelist(&self, server: &GameServer) -> Result<(), RemoteFailure> {
        let req = self.client.post(self.url(server, "whitelist/clear"));
        self.send(req).await.map(|_| ())
    }

    async fn stop_server(&self, server: &GameServer) -> Result<(), RemoteFailure> {
        let req = self.client.post(self.url(server, "stop"));
        self.send(req).await.map(|_| ())
    }

    async fn restart_server(&self, server: &GameServer, message: Option<&str>) -> Result<(), RemoteFailure> {
        let req = self.client.post(self.url(server, "restart")).json(&RestartRequest { message });
        self.send(req).await.map(|_| ())
    }

    async fn banlist(&self, server: &GameServer) -> Result<Vec<BannedPlayer>, RemoteFailure> {
        self.players(server, "bans").await
    }

    async fn whitelist(&self, server: &GameServer) -> Result<Vec<String>, RemoteFailure> {
        let players = self.players(server, "whitelist").await?;
        Ok(players.into_iter().map(|p| p.name).collect())
    }

    async fn search_players(
        &self,
        server: &GameServer,
        partial_name: &str,
    ) -> Result<Vec<PlayerAccount>, RemoteFailure> {
        let req = self
            .client
            .get(self.url(server, "players"))
            .query(&[("search", partial_name)]);
        let list: AccountList = self
            .send(req)
            .await?
            .json()
            .await
            .map_err(|_| RemoteFailure::new("Unreadable response from the game service"))?;
        Ok(list.players)
    }
}
