//! Configuration for the NATS-backed cache

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// NATS connection and bucket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    /// NATS server URLs (comma-separated when loaded from env)
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    /// Optional credentials file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
    /// Optional username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// KV bucket holding pending actions
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Upper bound on any entry's lifetime; per-key TTLs are enforced below it
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_servers() -> Vec<String> {
    vec!["localhost:4222".to_string()]
}

fn default_bucket() -> String {
    "fleet_pending".to_string()
}

fn default_max_age_secs() -> u64 {
    3600
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            credentials_file: None,
            username: None,
            password: None,
            bucket: default_bucket(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl KvConfig {
    /// Parse servers from a comma-separated URL string
    pub fn from_url(url: impl AsRef<str>) -> Self {
        let servers = url
            .as_ref()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            servers,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, file: impl Into<String>) -> Self {
        self.credentials_file = Some(file.into());
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}
